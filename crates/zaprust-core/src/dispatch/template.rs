//! Template renderer - substitutes per-contact variables into message text

use regex::RegexBuilder;
use std::collections::HashMap;
use zaprust_storage::models::QueueTask;

/// Renderer for `{{ variable }}` placeholders in message bodies
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Render a template with the given variables.
    ///
    /// Every `{{ name }}` occurrence is replaced case-insensitively and
    /// whitespace-tolerantly with the bound value. Placeholders with no
    /// binding are left intact.
    pub fn render(body: &str, variables: &HashMap<String, String>) -> String {
        let mut result = body.to_string();

        for (key, value) in variables {
            let pattern = format!(r"\{{\{{\s*{}\s*\}}\}}", regex::escape(key));
            // Keys come from a fixed set plus JSON attribute names; after
            // escaping, the pattern always compiles
            let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(re) => re,
                Err(_) => continue,
            };
            result = re
                .replace_all(&result, regex::NoExpand(value.as_str()))
                .into_owned();
        }

        result
    }

    /// Variable bindings for a queued task: `name`, `phone`, and the
    /// contact's custom attributes.
    pub fn task_variables(
        task: &QueueTask,
        attributes: Option<&serde_json::Value>,
    ) -> HashMap<String, String> {
        let mut variables = HashMap::new();
        variables.insert(
            "name".to_string(),
            task.contact_name.clone().unwrap_or_default(),
        );
        variables.insert("phone".to_string(), task.contact_phone.clone());

        if let Some(attrs) = attributes.and_then(|v| v.as_object()) {
            for (key, value) in attrs {
                let value_str = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    _ => value.to_string(),
                };
                variables.entry(key.clone()).or_insert(value_str);
            }
        }

        variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_basic() {
        let result = TemplateRenderer::render(
            "Hello {{name}}, we will call {{phone}}",
            &vars(&[("name", "Ana"), ("phone", "5511912345678")]),
        );
        assert_eq!(result, "Hello Ana, we will call 5511912345678");
    }

    #[test]
    fn test_render_case_insensitive_and_whitespace_tolerant() {
        let result = TemplateRenderer::render(
            "Hi {{Name}} ({{ name }})",
            &vars(&[("name", "Jo")]),
        );
        assert_eq!(result, "Hi Jo (Jo)");
    }

    #[test]
    fn test_render_empty_value() {
        let result = TemplateRenderer::render("Hi {{name}}!", &vars(&[("name", "")]));
        assert_eq!(result, "Hi !");
    }

    #[test]
    fn test_render_unbound_placeholder_kept() {
        let result = TemplateRenderer::render("Hi {{name}}, {{coupon}}", &vars(&[("name", "Jo")]));
        assert_eq!(result, "Hi Jo, {{coupon}}");
    }

    #[test]
    fn test_render_idempotent_without_placeholders() {
        let bindings = vars(&[("name", "Jo")]);
        let once = TemplateRenderer::render("Plain text, no variables.", &bindings);
        let twice = TemplateRenderer::render(&once, &bindings);
        assert_eq!(once, "Plain text, no variables.");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_render_repeated_occurrences() {
        let result =
            TemplateRenderer::render("{{name}} {{name}} {{ NAME }}", &vars(&[("name", "x")]));
        assert_eq!(result, "x x x");
    }

    #[test]
    fn test_task_variables_includes_attributes() {
        let task = QueueTask {
            id: uuid::Uuid::new_v4(),
            campaign_id: uuid::Uuid::new_v4(),
            contact_id: uuid::Uuid::new_v4(),
            contact_phone: "5511912345678".to_string(),
            contact_name: Some("Ana".to_string()),
            message_content: String::new(),
            media_url: None,
            media_type: None,
            status: "pending".to_string(),
            scheduled_at: chrono::Utc::now(),
            claimed_at: None,
            sent_at: None,
            provider_message_id: None,
            error_message: None,
            retry_count: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let attrs = serde_json::json!({"company": "Acme", "plan": "premium", "name": "ignored"});
        let variables = TemplateRenderer::task_variables(&task, Some(&attrs));

        assert_eq!(variables.get("name").unwrap(), "Ana");
        assert_eq!(variables.get("phone").unwrap(), "5511912345678");
        assert_eq!(variables.get("company").unwrap(), "Acme");
        assert_eq!(variables.get("plan").unwrap(), "premium");
    }
}
