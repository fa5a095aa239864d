//! Custom Ratatui widgets for chatbot-compare

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::scoring::bar_segments;

/// Two-colour bar: green for agreement, red for the rest
pub struct AgreementBar {
    pub value: u8,
    pub agree_style: Style,
    pub disagree_style: Style,
}

impl AgreementBar {
    pub fn new(value: u8) -> Self {
        Self {
            value: value.min(100),
            agree_style: Style::default().fg(Color::Green),
            disagree_style: Style::default().fg(Color::Red),
        }
    }
}

impl Widget for AgreementBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 || area.width < 1 {
            return;
        }

        let (agree, _) = bar_segments(self.value, area.width);

        for x in area.left()..area.right() {
            let style = if x < area.left() + agree {
                self.agree_style
            } else {
                self.disagree_style
            };
            buf.set_string(x, area.top(), "█", style);
        }
    }
}
