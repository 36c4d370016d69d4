use minijinja::{context, AutoEscape, Environment};

const INDEX_NAME: &str = "index.html";
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// HTML pages served by the gateway, compiled once at startup.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template(INDEX_NAME, INDEX_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render_index(&self, general_info: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template(INDEX_NAME)?
            .render(context! { general_info })
    }
}
