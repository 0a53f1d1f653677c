use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateTicketForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}
