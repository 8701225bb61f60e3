use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::page::{Example, Page};
use crate::placeholder::scan_tokens;

/// Substitute a value for every placeholder token of `example`.
///
/// A placeholder resolves to its non-empty binding in `variables`, else its
/// non-empty default, else its own name. Substitution is a single pass over
/// the original template: resolved values are copied verbatim and never
/// scanned for further tokens. Tokens with no matching placeholder are left
/// untouched.
pub fn render(example: &Example, variables: &HashMap<String, String>) -> String {
    let resolved = example
        .placeholders
        .iter()
        .map(|placeholder| {
            let value = variables
                .get(&placeholder.name)
                .filter(|value| !value.is_empty())
                .map(String::as_str)
                .or_else(|| Some(placeholder.default.as_str()).filter(|value| !value.is_empty()))
                .unwrap_or(placeholder.name.as_str());
            (placeholder.name.as_str(), value)
        })
        .collect::<HashMap<_, _>>();

    let template = example.command_template.as_str();
    let mut output = String::with_capacity(template.len());
    let mut cursor = 0usize;
    for token in scan_tokens(template) {
        let Some(value) = resolved.get(token.name) else {
            continue;
        };
        output.push_str(&template[cursor..token.start]);
        output.push_str(value);
        cursor = token.end;
    }
    output.push_str(&template[cursor..]);
    output
}

/// First example whose description contains `query` (case-insensitive),
/// falling back to the first example. `None` only for a page without examples.
pub fn find_best_example<'a>(page: &'a Page, query: &str) -> Option<&'a Example> {
    let query = query.to_lowercase();
    page.examples
        .iter()
        .find(|example| example.description.to_lowercase().contains(&query))
        .or_else(|| page.examples.first())
}

/// Render the best example of `page` for `query`.
pub fn render_command(
    page: &Page,
    query: &str,
    variables: &HashMap<String, String>,
) -> Result<String> {
    let example = find_best_example(page, query).ok_or_else(|| Error::NoSuitableExample {
        command: query.to_string(),
    })?;
    Ok(render(example, variables))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{find_best_example, render, render_command};
    use crate::error::Error;
    use crate::page::{Example, IndexEntry, Page};
    use crate::placeholder::{Placeholder, extract};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn render_substitutes_bindings() {
        let example = Example::new("Extract", "tar -xf {{file}}");
        assert_eq!(
            render(&example, &vars(&[("file", "a.tar.gz")])),
            "tar -xf a.tar.gz"
        );
    }

    #[test]
    fn render_falls_back_to_placeholder_name() {
        let example = Example::new("Extract", "tar -xf {{file}}");
        assert_eq!(render(&example, &HashMap::new()), "tar -xf file");
        assert_eq!(render(&example, &vars(&[("file", "")])), "tar -xf file");
    }

    #[test]
    fn render_prefers_binding_then_default() {
        let example = Example::with_placeholders(
            "Extract",
            "tar -xf {{file}}",
            vec![Placeholder::new("file").with_default("default.tar.gz")],
        );
        assert_eq!(render(&example, &HashMap::new()), "tar -xf default.tar.gz");
        assert_eq!(
            render(&example, &vars(&[("file", "mine.tar")])),
            "tar -xf mine.tar"
        );
    }

    #[test]
    fn render_replaces_every_occurrence() {
        let example = Example::new("Copy back", "cp {{src}} {{src}}.bak && rm {{src}}");
        assert_eq!(
            render(&example, &vars(&[("src", "notes.txt")])),
            "cp notes.txt notes.txt.bak && rm notes.txt"
        );
    }

    #[test]
    fn render_does_not_rescan_substituted_values() {
        let example = Example::new("Copy", "cp {{src}} {{dest}}");
        let rendered = render(&example, &vars(&[("src", "{{dest}}"), ("dest", "out")]));
        assert_eq!(rendered, "cp {{dest}} out");
    }

    #[test]
    fn render_leaves_unknown_tokens_alone() {
        let example = Example::with_placeholders(
            "Partial",
            "echo {{known}} {{unknown}}",
            vec![Placeholder::new("known")],
        );
        assert_eq!(
            render(&example, &vars(&[("known", "hi")])),
            "echo hi {{unknown}}"
        );
    }

    #[test]
    fn fallback_render_leaves_no_placeholders() {
        for template in ["tar -xf {{file}}", "scp {{user}}@{{host}}:{{path}} .", "ls"] {
            let example = Example::new("x", template);
            let rendered = render(&example, &HashMap::new());
            assert!(extract(&rendered).is_empty(), "tokens left in {rendered}");
        }
    }

    fn tar_page(examples: Vec<Example>) -> Page {
        Page::new(&IndexEntry::new("tar", "Archive utility", "linux"), examples)
    }

    #[test]
    fn best_example_prefers_description_match_then_first() {
        let page = tar_page(vec![
            Example::new("Extract archive", "tar -xf {{file}}"),
            Example::new("List contents", "tar -tf {{file}}"),
        ]);
        assert_eq!(
            find_best_example(&page, "LIST").map(|example| example.description.as_str()),
            Some("List contents")
        );
        assert_eq!(
            find_best_example(&page, "tar").map(|example| example.description.as_str()),
            Some("Extract archive")
        );
        assert!(find_best_example(&tar_page(Vec::new()), "tar").is_none());
    }

    #[test]
    fn render_command_reports_missing_examples() {
        let error = render_command(&tar_page(Vec::new()), "tar", &HashMap::new())
            .expect_err("must fail");
        assert!(matches!(error, Error::NoSuitableExample { ref command } if command == "tar"));

        let page = tar_page(vec![Example::new("Extract archive", "tar -xf {{file}}")]);
        let rendered =
            render_command(&page, "tar", &vars(&[("file", "x.tgz")])).expect("render");
        assert_eq!(rendered, "tar -xf x.tgz");
    }
}
