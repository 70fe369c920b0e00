//! Child order of the property containers we edit.
//!
//! WordprocessingML declares `pPr` and `rPr` children as an `xsd:sequence`;
//! Word rejects files whose property elements are out of order. Inserting
//! at the rank below keeps a container valid.

use crate::xml::{Element, Node};

/// `CT_PPr` sequence
pub const PARAGRAPH_PROPERTIES: &[&str] = &[
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
    "numPr",
    "suppressLineNumbers",
    "pBdr",
    "shd",
    "tabs",
    "suppressAutoHyphens",
    "kinsoku",
    "wordWrap",
    "overflowPunct",
    "topLinePunct",
    "autoSpaceDE",
    "autoSpaceDN",
    "bidi",
    "adjustRightInd",
    "snapToGrid",
    "spacing",
    "ind",
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
    "pPrChange",
];

/// `CT_RPr` sequence
pub const RUN_PROPERTIES: &[&str] = &[
    "rStyle",
    "rFonts",
    "b",
    "bCs",
    "i",
    "iCs",
    "caps",
    "smallCaps",
    "strike",
    "dstrike",
    "outline",
    "shadow",
    "emboss",
    "imprint",
    "noProof",
    "snapToGrid",
    "vanish",
    "webHidden",
    "color",
    "spacing",
    "w",
    "kern",
    "position",
    "sz",
    "szCs",
    "highlight",
    "u",
    "effect",
    "bdr",
    "shd",
    "fitText",
    "vertAlign",
    "rtl",
    "cs",
    "em",
    "lang",
    "eastAsianLayout",
    "specVanish",
    "oMath",
    "rPrChange",
];

fn rank(order: &[&str], prefix: &str, el: &Element) -> Option<usize> {
    if el.prefix() != Some(prefix) {
        return None;
    }
    order.iter().position(|name| *name == el.local_name())
}

/// Node index at which `local` belongs inside `parent`.
///
/// That is just before the first child ranked after `local`; children the
/// sequence does not know (extensions, markup compatibility) are skipped.
pub fn insertion_index(parent: &Element, order: &[&str], prefix: &str, local: &str) -> usize {
    let Some(target) = order.iter().position(|name| *name == local) else {
        return parent.children.len();
    };

    parent
        .children
        .iter()
        .position(|node| match node {
            Node::Element(el) => rank(order, prefix, el).is_some_and(|r| r > target),
            _ => false,
        })
        .unwrap_or(parent.children.len())
}

/// Find the child `prefix:local`, creating it at its sequence position
pub fn ensure_child<'e>(
    parent: &'e mut Element,
    order: &[&str],
    prefix: &str,
    local: &str,
) -> &'e mut Element {
    let name = format!("{prefix}:{local}");
    let index = match parent.child_index(&name) {
        Some(index) => index,
        None => {
            let index = insertion_index(parent, order, prefix, local);
            parent.children.insert(index, Node::Element(Element::new(name)));
            index
        }
    };
    element_at(parent, index)
}

/// Find the child `name` and make it the first element child, creating it if absent
pub fn ensure_first_child<'e>(parent: &'e mut Element, name: &str) -> &'e mut Element {
    let first = parent.first_element_index();
    let index = match (parent.child_index(name), first) {
        (Some(index), Some(first)) if index == first => index,
        (Some(index), Some(first)) => {
            let node = parent.children.remove(index);
            parent.children.insert(first, node);
            first
        }
        (_, first) => {
            let index = first.unwrap_or(0);
            parent
                .children
                .insert(index, Node::Element(Element::new(name)));
            index
        }
    };
    element_at(parent, index)
}

fn element_at(parent: &mut Element, index: usize) -> &mut Element {
    match parent.element_at_mut(index) {
        Some(el) => el,
        None => unreachable!("node {index} was just located as an element"),
    }
}
