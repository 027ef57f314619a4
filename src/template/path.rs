//! Scope-relative path resolution
//!
//! All template sources live under one scope root. Paths are normalized to a
//! leading-slash form (`/components/card.html`); a `..` that would climb above
//! the root is rejected.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("import outside of scope: {path}")]
pub struct OutOfScope {
    pub path: String,
}

/// Resolve `href` against the directory `base`
pub fn resolve(base: &str, href: &str) -> Result<String, OutOfScope> {
    let mut segments: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(OutOfScope {
                        path: href.to_string(),
                    });
                }
            }
            s => segments.push(s),
        }
    }

    Ok(format!("/{}", segments.join("/")))
}

/// Directory part of a resolved path, with a trailing slash
pub fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(index) => path[..=index].to_string(),
        None => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to_base() {
        assert_eq!(resolve("/", "card.html").unwrap(), "/card.html");
        assert_eq!(resolve("/", "./card.html").unwrap(), "/card.html");
        assert_eq!(
            resolve("/components/", "icons/star.html").unwrap(),
            "/components/icons/star.html"
        );
    }

    #[test]
    fn test_resolve_parent_segments() {
        assert_eq!(
            resolve("/components/cards/", "../icons/star.html").unwrap(),
            "/components/icons/star.html"
        );
        assert_eq!(
            resolve("/components/", "../layout.html").unwrap(),
            "/layout.html"
        );
    }

    #[test]
    fn test_absolute_href_ignores_base() {
        assert_eq!(resolve("/components/", "/shared/a.html").unwrap(), "/shared/a.html");
    }

    #[test]
    fn test_escaping_the_root_is_out_of_scope() {
        let err = resolve("/components/", "../../secret.html").unwrap_err();
        assert_eq!(err.path, "../../secret.html");
        assert!(resolve("/", "../a.html").is_err());
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("/components/card.html"), "/components/");
        assert_eq!(parent_dir("/card.html"), "/");
    }
}
