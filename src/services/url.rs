use url::Url;

/// Reconciles relative, absolute and locale-prefixed paths before navigation.
///
/// - Absolute URLs (`https://…`, `mailto:…`, `//host/…`) pass through untouched.
/// - Everything else becomes a rooted path with repeated `/` collapsed.
/// - With a `locale` configured, paths whose first segment is not already a known
///   locale are prefixed with `/{locale}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlNormalizer {
    pub locale: Option<String>,
    pub locales: Vec<String>,
}

impl UrlNormalizer {
    pub fn new(locale: Option<String>, locales: Vec<String>) -> Self {
        Self { locale, locales }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let raw = raw.trim();
        if is_absolute(raw) {
            return raw.to_string();
        }

        let split = raw.find(['?', '#']).unwrap_or(raw.len());
        let (path, suffix) = raw.split_at(split);
        let path = path.strip_prefix("./").unwrap_or(path);

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut out = String::with_capacity(raw.len() + 8);

        if let Some(locale) = &self.locale {
            let prefixed = segments
                .first()
                .is_some_and(|first| {
                    *first == locale.as_str() || self.locales.iter().any(|l| l.as_str() == *first)
                });
            if !prefixed {
                out.push('/');
                out.push_str(locale);
            }
        }
        for segment in &segments {
            out.push('/');
            out.push_str(segment);
        }
        if out.is_empty() {
            out.push('/');
        }
        out.push_str(suffix);
        out
    }
}

fn is_absolute(raw: &str) -> bool {
    if raw.starts_with("//") {
        return true;
    }
    Url::parse(raw)
        .is_ok_and(|u| !u.cannot_be_a_base() || matches!(u.scheme(), "mailto" | "tel"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_and_collapses_paths() {
        let n = UrlNormalizer::default();
        assert_eq!(n.normalize(""), "/");
        assert_eq!(n.normalize("orders"), "/orders");
        assert_eq!(n.normalize("./orders//7/"), "/orders/7");
        assert_eq!(n.normalize("/a?x=1#top"), "/a?x=1#top");
    }

    #[test]
    fn absolute_urls_pass_through() {
        let n = UrlNormalizer::new(Some("pt".into()), vec!["pt".into(), "en".into()]);
        assert_eq!(n.normalize("https://example.com/x"), "https://example.com/x");
        assert_eq!(n.normalize("//cdn.example.com/a"), "//cdn.example.com/a");
        assert_eq!(n.normalize("mailto:a@b.c"), "mailto:a@b.c");
    }

    #[test]
    fn prefixes_locale_once() {
        let n = UrlNormalizer::new(Some("pt".into()), vec!["pt".into(), "en".into()]);
        assert_eq!(n.normalize("/dashboard"), "/pt/dashboard");
        assert_eq!(n.normalize("/en/dashboard"), "/en/dashboard");
        assert_eq!(n.normalize("/pt/dashboard"), "/pt/dashboard");
        assert_eq!(n.normalize("/"), "/pt");
    }
}
