use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::breeds::queries::preview;
use crate::breeds::{Breed, Image, Pagination, ReferenceImage};
use crate::subscription::query::QueryState;

use super::{App, View};

const LOADING: &str = "Loading...";

impl App {
    pub(super) fn draw(&self, frame: &mut Frame<'_>) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let title = Paragraph::new("Cat Breeds".bold().fg(Color::Cyan))
            .centered()
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, header);

        match &self.view {
            View::Listing => self.draw_listing(frame, body),
            View::Detail { .. } => self.draw_detail(frame, body),
        }

        frame.render_widget(Paragraph::new(self.footer()), footer);
    }

    fn footer(&self) -> Line<'static> {
        let help = match self.view {
            View::Listing => "↑/↓ select  Enter open  ←/→ page  r refresh  q quit",
            View::Detail { .. } => "Esc back  r refresh  q quit",
        };
        let mut spans = vec![Span::raw(help).dark_gray()];
        if let Some(e) = &self.terminal_error {
            spans.push(Span::raw(format!("  Terminal error: {e}")).red());
        }
        Line::from(spans)
    }

    fn draw_listing(&self, frame: &mut Frame<'_>, area: Rect) {
        let data = match &self.breeds {
            QueryState::Idle | QueryState::Loading => {
                frame.render_widget(Paragraph::new(LOADING), area);
                return;
            }
            QueryState::Error(e) => {
                frame.render_widget(error(e), area);
                return;
            }
            QueryState::Success { data, .. } => data,
        };

        let [list, pages, status] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let items: Vec<ListItem<'_>> = data.breeds.iter().map(breed_item).collect();
        let mut state = ListState::default().with_selected(Some(self.cursor));
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Breeds"))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("> "),
            list,
            &mut state,
        );

        frame.render_widget(Paragraph::new(page_bar(self.page, &data.pagination)), pages);

        if self.breeds.is_fetching() {
            frame.render_widget(Paragraph::new("Updating...".yellow()), status);
        }
    }

    fn draw_detail(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Back (Esc)");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let breed = match &self.detail.breed {
            QueryState::Idle | QueryState::Loading => {
                frame.render_widget(Paragraph::new(LOADING), inner);
                return;
            }
            QueryState::Error(e) => {
                frame.render_widget(error(e), inner);
                return;
            }
            QueryState::Success { data: None, .. } => {
                frame.render_widget(Paragraph::new("No breed found."), inner);
                return;
            }
            QueryState::Success {
                data: Some(breed), ..
            } => breed,
        };

        let [name, description, pictures, status] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .areas(inner);

        frame.render_widget(Paragraph::new(breed.name.as_str().bold()), name);
        frame.render_widget(
            Paragraph::new(breed.description.as_str()).wrap(Wrap { trim: true }),
            description,
        );
        frame.render_widget(Paragraph::new(self.picture_lines(breed)), pictures);

        if self.detail.breed.is_fetching() {
            frame.render_widget(Paragraph::new("Background Updating...".yellow()), status);
        }
    }

    fn picture_lines(&self, breed: &Breed) -> Vec<Line<'static>> {
        let mut lines = vec![reference_line(breed, &self.detail.reference)];
        match &self.detail.gallery {
            QueryState::Idle | QueryState::Loading => lines.push(Line::from("...")),
            QueryState::Error(e) => lines.push(Line::from(format!("Error: {e}")).red()),
            QueryState::Success { data, .. } => {
                lines.extend(preview(data).iter().map(image_line));
            }
        }
        lines
    }
}

fn error(message: &str) -> Paragraph<'static> {
    Paragraph::new(format!("Error: {message}"))
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
}

fn breed_item(breed: &Breed) -> ListItem<'static> {
    match &breed.image {
        Some(image) => ListItem::new(Line::from(vec![
            Span::raw(breed.name.clone()),
            Span::raw(format!("  {}", image.url)).dark_gray(),
        ])),
        None => ListItem::new(breed.name.clone()),
    }
}

/// Page numbers, one-based, with the current one highlighted.
fn page_bar(current: u32, pagination: &Pagination) -> Line<'static> {
    let mut spans = Vec::with_capacity(pagination.page_count() as usize);
    for page in 0..pagination.page_count() {
        let label = format!(" {} ", page + 1);
        spans.push(if page == current {
            Span::raw(label).reversed()
        } else {
            Span::raw(label)
        });
    }
    Line::from(spans)
}

fn reference_line(breed: &Breed, reference: &QueryState<ReferenceImage>) -> Line<'static> {
    match reference {
        QueryState::Success { data, .. } => {
            let name = data.name.as_deref().unwrap_or(&breed.name);
            Line::from(format!(
                "{name} cat pic: {} ({}x{})",
                data.url, data.width, data.height
            ))
        }
        QueryState::Error(e) => Line::from(format!("Error: {e}")).red(),
        QueryState::Idle if breed.reference_image_id.is_none() => {
            Line::from("No reference image.").dark_gray()
        }
        QueryState::Idle | QueryState::Loading => Line::from("..."),
    }
}

fn image_line(image: &Image) -> Line<'static> {
    Line::from(format!("  {} ({}x{})", image.url, image.width, image.height))
}
