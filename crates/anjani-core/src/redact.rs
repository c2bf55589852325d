pub const PLACEHOLDER: &str = "[REDACTED]";

/// Replaces configured secret values in arbitrary text with [`PLACEHOLDER`].
///
/// Empty or absent secrets are dropped at construction: an empty needle would match
/// everywhere.
#[derive(Clone, Debug, Default)]
pub struct Redactor {
    // Longest first, so a secret that contains another one is replaced whole.
    secrets: Vec<String>,
}

enum Piece<'a> {
    Text(&'a str),
    Redacted,
}

impl Redactor {
    pub fn new<'a>(secrets: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Replace every occurrence of every secret.
    ///
    /// Existing placeholders are never rewritten, so `redact(redact(t)) == redact(t)`.
    /// A secret straddling a placeholder already in the input (`D]42` in `[REDACTED]42`)
    /// is therefore left as is.
    pub fn redact(&self, text: &str) -> String {
        if !self.secrets.iter().any(|s| text.contains(s.as_str())) {
            return text.to_string();
        }

        let mut pieces = split_on(text, PLACEHOLDER);
        for secret in &self.secrets {
            pieces = pieces
                .into_iter()
                .flat_map(|p| match p {
                    Piece::Text(t) if t.contains(secret.as_str()) => split_on(t, secret),
                    other => vec![other],
                })
                .collect();
        }

        let mut out = String::with_capacity(text.len());
        for p in pieces {
            match p {
                Piece::Text(t) => out.push_str(t),
                Piece::Redacted => out.push_str(PLACEHOLDER),
            }
        }
        out
    }
}

fn split_on<'a>(text: &'a str, needle: &str) -> Vec<Piece<'a>> {
    let mut pieces = Vec::new();
    for (i, part) in text.split(needle).enumerate() {
        if i > 0 {
            pieces.push(Piece::Redacted);
        }
        if !part.is_empty() {
            pieces.push(Piece::Text(part));
        }
    }
    pieces
}
