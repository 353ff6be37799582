//! Templates for generated project documents.

use minijinja::{context, Environment};

use crate::todo::TodoSection;

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);

        env.add_template("todo.md", TODO_TEMPLATE)
            .expect("Failed to add todo template");

        Self { env }
    }

    /// Render the TODO list as Markdown tables, one per marker kind.
    pub fn render_todo(&self, sections: &[TodoSection]) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template("todo.md")?;
        tmpl.render(context! { sections => sections })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

const TODO_TEMPLATE: &str = r#"{% for section in sections %}
### {{ section.title }}
| Filename | line # | {{ section.kind }}
|:------|:------:|:------
{% for item in section.items %}
| [{{ item.file }}]({{ item.file }}#L{{ item.line }}) | {{ item.line }} | {{ item.text }}
{% endfor %}

{% endfor %}
"#;
