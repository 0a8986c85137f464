//! Tree properties over generated content

use proptest::prelude::*;
use vigil_dom::{Document, Markup};

fn visible(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

proptest! {
    #[test]
    fn script_text_is_never_visible(
        paragraphs in prop::collection::vec("[a-z ]{0,12}", 0..8),
        script in "[a-z{}(); ]{0,40}",
    ) {
        let mut doc = Document::new();
        let body = doc.body();
        for text in &paragraphs {
            let node = doc.build(&Markup::element("p").with_text(text.as_str()));
            doc.append_child(body, node).unwrap();
        }
        let node = doc.build(&Markup::element("script").with_text(script.as_str()));
        doc.append_child(body, node).unwrap();

        let expected: usize = paragraphs.iter().map(|t| visible(t)).sum();
        prop_assert_eq!(doc.visible_text_len(body), expected);
    }

    #[test]
    fn every_mutation_bumps_the_revision(count in 1usize..10, remove in 0usize..10) {
        let mut doc = Document::new();
        let body = doc.body();
        let mut nodes = Vec::new();
        let mut last = doc.revision();
        for i in 0..count {
            let node = doc.build(&Markup::element("div").id(format!("n{i}")));
            doc.append_child(body, node).unwrap();
            prop_assert!(doc.revision() > last);
            last = doc.revision();
            nodes.push(node);
        }

        let target = nodes[remove % count];
        doc.remove(target).unwrap();
        prop_assert!(doc.revision() > last);
        prop_assert!(!doc.is_attached(target));
        prop_assert_eq!(doc.element_children(body).len(), count - 1);
    }
}
