//! Tab-completion providers and common-prefix narrowing.

/// Maps the current line to an ordered list of candidate replacements.
pub trait Completer {
    fn complete(&mut self, line: &str) -> Vec<String>;
}

impl<F> Completer for F
where
    F: FnMut(&str) -> Vec<String>,
{
    fn complete(&mut self, line: &str) -> Vec<String> {
        self(line)
    }
}

/// Longest prefix shared by every candidate, compared character by character.
///
/// Empty for an empty candidate list.
pub fn longest_common_prefix<S: AsRef<str>>(candidates: &[S]) -> &str {
    let Some((first, rest)) = candidates.split_first() else {
        return "";
    };
    let first = first.as_ref();
    let mut end = first.len();
    for candidate in rest {
        let candidate = candidate.as_ref();
        let shared = first[..end]
            .char_indices()
            .zip(candidate.chars())
            .find(|((_, ours), theirs)| ours != theirs)
            .map(|((index, _), _)| index)
            .unwrap_or_else(|| end.min(candidate.len()));
        end = shared;
        if end == 0 {
            break;
        }
    }
    &first[..end]
}

#[cfg(test)]
mod tests {
    use super::{longest_common_prefix, Completer};

    #[test]
    fn prefix_of_diverging_candidates() {
        assert_eq!(longest_common_prefix(&["blue", "black"]), "bl");
        assert_eq!(longest_common_prefix(&["blue", "black", "brown"]), "b");
        assert_eq!(longest_common_prefix(&["red", "blue"]), "");
    }

    #[test]
    fn prefix_stops_at_shortest_candidate() {
        assert_eq!(longest_common_prefix(&["blueberry", "blue"]), "blue");
        assert_eq!(longest_common_prefix(&["blue", "blueberry"]), "blue");
    }

    #[test]
    fn single_and_empty_lists() {
        assert_eq!(longest_common_prefix(&["blueberry"]), "blueberry");
        assert_eq!(longest_common_prefix::<&str>(&[]), "");
    }

    #[test]
    fn multibyte_characters_are_compared_whole() {
        assert_eq!(longest_common_prefix(&["héllo", "hélp"]), "hél");
        assert_eq!(longest_common_prefix(&["é", "è"]), "");
    }

    #[test]
    fn closures_are_completers() {
        let mut calls = 0;
        let mut completer = |line: &str| {
            calls += 1;
            vec![format!("{line}!")]
        };
        assert_eq!(completer.complete("hi"), vec!["hi!".to_string()]);
        drop(completer);
        assert_eq!(calls, 1);
    }
}
