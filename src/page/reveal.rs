use super::dom::{Document, NodeId, Rect};

/// Visible share of a section needed to reveal it.
pub const THRESHOLD: f64 = 0.1;

/// The viewport is shrunk by this much at the bottom.
pub const ROOT_MARGIN_BOTTOM: f64 = 50.0;

/// Fades every `section` in the first time enough of it scrolls into view.
#[derive(Debug, Clone)]
pub struct SectionReveal {
    sections: Vec<(NodeId, bool)>,
}

impl SectionReveal {
    /// Hide every section. `None` when the page has none.
    pub fn init(doc: &mut Document) -> Option<Self> {
        let sections = doc.query_tags(&["section"]);
        if sections.is_empty() {
            return None;
        }

        for &section in &sections {
            doc.set_style(section, "opacity", "0");
            doc.set_style(section, "transform", "translateY(30px)");
            doc.set_style(section, "transition", "opacity 0.6s ease, transform 0.6s ease");
        }

        Some(Self {
            sections: sections.into_iter().map(|id| (id, false)).collect(),
        })
    }

    /// Reveal sections crossing the threshold for a viewport starting at
    /// `scroll_y`. Returns the ones revealed by this call.
    pub fn evaluate(&mut self, doc: &mut Document, scroll_y: f64, inner_height: f64) -> Vec<NodeId> {
        let top = scroll_y;
        let bottom = scroll_y + inner_height - ROOT_MARGIN_BOTTOM;

        let mut revealed = vec![];

        for (section, done) in &mut self.sections {
            if *done || visible_ratio(doc.rect(*section), top, bottom) < THRESHOLD {
                continue;
            }

            doc.set_style(*section, "opacity", "1");
            doc.set_style(*section, "transform", "translateY(0)");
            *done = true;
            revealed.push(*section);
        }

        revealed
    }

    pub fn is_revealed(&self, section: NodeId) -> bool {
        self.sections
            .iter()
            .any(|&(id, done)| id == section && done)
    }
}

/// Share of `rect` between `top` and `bottom`.
pub fn visible_ratio(rect: Rect, top: f64, bottom: f64) -> f64 {
    let overlap = rect.bottom().min(bottom) - rect.top.max(top);

    if rect.height <= 0.0 {
        // an empty box counts as fully visible while inside the viewport
        return if rect.top >= top && rect.top <= bottom { 1.0 } else { 0.0 };
    }

    (overlap / rect.height).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_ratio() {
        assert_eq!(visible_ratio(Rect::new(0.0, 100.0), 0.0, 750.0), 1.0);
        assert_eq!(visible_ratio(Rect::new(700.0, 100.0), 0.0, 750.0), 0.5);
        assert_eq!(visible_ratio(Rect::new(800.0, 100.0), 0.0, 750.0), 0.0);
        assert_eq!(visible_ratio(Rect::new(-90.0, 100.0), 0.0, 750.0), 0.1);
        assert_eq!(visible_ratio(Rect::new(10.0, 0.0), 0.0, 750.0), 1.0);
    }

    #[test]
    fn test_margin_shrinks_viewport() {
        let mut doc = Document::new();
        let body = doc.body();
        // 40px of 100 would be inside an 800px viewport, but not inside the
        // 750px effective one
        let below = doc.append_element(body, "section", "");
        doc.set_rect(below, Rect::new(760.0, 100.0));

        let mut reveal = SectionReveal::init(&mut doc).unwrap();

        assert!(reveal.evaluate(&mut doc, 0.0, 800.0).is_empty());
        assert_eq!(doc.style(below, "opacity"), Some("0"));

        assert_eq!(reveal.evaluate(&mut doc, 30.0, 800.0), vec![below]);
        assert_eq!(doc.style(below, "opacity"), Some("1"));
        assert_eq!(doc.style(below, "transform"), Some("translateY(0)"));
    }

    #[test]
    fn test_each_section_reveals_once() {
        let mut doc = Document::new();
        let body = doc.body();
        let section = doc.append_element(body, "section", "hero");
        doc.set_rect(section, Rect::new(0.0, 400.0));

        let mut reveal = SectionReveal::init(&mut doc).unwrap();

        assert_eq!(reveal.evaluate(&mut doc, 0.0, 800.0), vec![section]);
        assert!(reveal.evaluate(&mut doc, 2000.0, 800.0).is_empty());
        assert!(reveal.evaluate(&mut doc, 0.0, 800.0).is_empty());
        assert!(reveal.is_revealed(section));
        assert_eq!(doc.style(section, "opacity"), Some("1"));
    }
}
