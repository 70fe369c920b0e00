use log::trace;

use crate::xml::{Element, Namespaces};

use super::policy::StylePolicy;
use super::schema::{PARAGRAPH_PROPERTIES, RUN_PROPERTIES, ensure_child, ensure_first_child};

/// Counts reported after a normalization pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FootnoteStats {
    /// Every `footnote` element, separators and continuation notices included
    pub footnotes: usize,
    pub paragraphs: usize,
    pub runs: usize,
}

/// Qualified names, computed once per part
struct Names {
    footnote: String,
    paragraph: String,
    paragraph_properties: String,
    run: String,
    run_properties: String,
    id: String,
    before: String,
    after: String,
    line: String,
    ascii: String,
    h_ansi: String,
    east_asia: String,
    cs: String,
    theme_fonts: [String; 4],
    val: String,
    italic: String,
    italic_cs: String,
    theme_color: [String; 3],
}

impl Names {
    fn new(ns: &Namespaces) -> Self {
        Self {
            footnote: ns.w("footnote"),
            paragraph: ns.w("p"),
            paragraph_properties: ns.w("pPr"),
            run: ns.w("r"),
            run_properties: ns.w("rPr"),
            id: ns.w("id"),
            before: ns.w("before"),
            after: ns.w("after"),
            line: ns.w("line"),
            ascii: ns.w("ascii"),
            h_ansi: ns.w("hAnsi"),
            east_asia: ns.w("eastAsia"),
            cs: ns.w("cs"),
            theme_fonts: [
                ns.w("asciiTheme"),
                ns.w("hAnsiTheme"),
                ns.w("eastAsiaTheme"),
                ns.w("cstheme"),
            ],
            val: ns.w("val"),
            italic: ns.w("i"),
            italic_cs: ns.w("iCs"),
            theme_color: [ns.w("themeColor"), ns.w("themeTint"), ns.w("themeShade")],
        }
    }
}

/// Applies a [`StylePolicy`] to every paragraph and run of every footnote.
///
/// The pass mutates the tree in place and is idempotent.
pub struct FootnoteNormalizer<'a> {
    policy: &'a StylePolicy,
    prefix: &'a str,
    names: Names,
}

impl<'a> FootnoteNormalizer<'a> {
    pub fn new(policy: &'a StylePolicy, ns: &'a Namespaces) -> Self {
        Self {
            policy,
            prefix: &ns.w,
            names: Names::new(ns),
        }
    }

    /// Normalize all footnotes below `root`, in document order
    pub fn normalize(&self, root: &mut Element) -> FootnoteStats {
        let names = &self.names;
        let mut stats = FootnoteStats::default();

        let mut visit_footnote = |footnote: &mut Element| {
            stats.footnotes += 1;
            trace!("footnote id={}", footnote.attribute(&names.id).unwrap_or("?"));

            let mut visit_paragraph = |paragraph: &mut Element| {
                stats.paragraphs += 1;
                stats.runs += self.normalize_paragraph(paragraph);
            };
            for_each_descendant(footnote, &names.paragraph, None, &mut visit_paragraph);
        };
        for_each_descendant(root, &names.footnote, None, &mut visit_footnote);

        stats
    }

    /// Style one paragraph and the runs it owns; returns the run count.
    ///
    /// Runs of nested paragraphs (text boxes) are left to their own paragraph.
    fn normalize_paragraph(&self, paragraph: &mut Element) -> usize {
        let names = &self.names;
        let policy = self.policy;

        let properties = ensure_first_child(paragraph, &names.paragraph_properties);
        let spacing = ensure_child(properties, PARAGRAPH_PROPERTIES, self.prefix, "spacing");
        spacing.set_attribute(&names.before, &policy.spacing_before.to_string());
        spacing.set_attribute(&names.after, &policy.spacing_after.to_string());
        spacing.set_attribute(&names.line, &policy.line.to_string());

        let mut runs = 0;
        let mut visit_run = |run: &mut Element| {
            runs += 1;
            self.normalize_run(run);
        };
        for_each_descendant(
            paragraph,
            &names.run,
            Some(names.paragraph.as_str()),
            &mut visit_run,
        );
        runs
    }

    fn normalize_run(&self, run: &mut Element) {
        let names = &self.names;
        let policy = self.policy;
        let properties = ensure_first_child(run, &names.run_properties);

        let fonts = ensure_child(properties, RUN_PROPERTIES, self.prefix, "rFonts");
        fonts.set_attribute(&names.ascii, &policy.latin_font);
        fonts.set_attribute(&names.h_ansi, &policy.latin_font);
        fonts.set_attribute(&names.east_asia, &policy.east_asian_font);
        fonts.set_attribute(&names.cs, &policy.latin_font);
        // Theme fonts win over explicit faces
        for theme in &names.theme_fonts {
            fonts.remove_attribute(theme);
        }

        let size = policy.size_half_points.to_string();
        for local in ["sz", "szCs"] {
            ensure_child(properties, RUN_PROPERTIES, self.prefix, local)
                .set_attribute(&names.val, &size);
        }

        properties.remove_children(&names.italic);
        properties.remove_children(&names.italic_cs);

        let color = ensure_child(properties, RUN_PROPERTIES, self.prefix, "color");
        color.set_attribute(&names.val, &policy.color);
        for theme in &names.theme_color {
            color.remove_attribute(theme);
        }
    }
}

/// Call `f` on each descendant of `el` named `name`, in document order.
///
/// A match is visited before its own subtree is searched. Subtrees rooted at
/// `stop` are not entered.
fn for_each_descendant(
    el: &mut Element,
    name: &str,
    stop: Option<&str>,
    f: &mut dyn FnMut(&mut Element),
) {
    for child in el.child_elements_mut() {
        if child.name == name {
            f(child);
        } else if stop.is_some_and(|stop| child.name == stop) {
            continue;
        }
        for_each_descendant(child, name, stop, f);
    }
}
