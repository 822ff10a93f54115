//! Endpoint template rendering.

const API_KEY_PLACEHOLDER: &str = "{ApiKey}";

/// Render an endpoint template.
///
/// Each `(placeholder, value)` pair replaces `{placeholder}` with the decimal value.
/// `{ApiKey}` is replaced with the key; a template without it gets the key appended,
/// since such templates end in `?apikey=`.
#[must_use]
pub fn render_endpoint(template: &str, api_key: &str, ids: &[(&str, i64)]) -> String {
    let mut rendered = template.trim().to_string();
    for (name, value) in ids {
        rendered = rendered.replace(&format!("{{{name}}}"), &value.to_string());
    }
    if rendered.contains(API_KEY_PLACEHOLDER) {
        rendered.replace(API_KEY_PLACEHOLDER, api_key)
    } else {
        rendered.push_str(api_key);
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_appended_when_not_templated() {
        assert_eq!(
            render_endpoint("http://radarr:7878/api/v3/queue?apikey=", "k1", &[]),
            "http://radarr:7878/api/v3/queue?apikey=k1"
        );
    }

    #[test]
    fn placeholders_are_substituted() {
        assert_eq!(
            render_endpoint(
                "http://radarr/api/v3/queue/{id}?apikey={ApiKey}&removeFromClient=true",
                "k1",
                &[("id", 42)]
            ),
            "http://radarr/api/v3/queue/42?apikey=k1&removeFromClient=true"
        );
        assert_eq!(
            render_endpoint("http://sonarr/api/v3/series/{seriesId}?apikey=", "k2", &[(
                "seriesId", 7
            )]),
            "http://sonarr/api/v3/series/7?apikey=k2"
        );
    }
}
