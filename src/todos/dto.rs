use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateTodoForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}
