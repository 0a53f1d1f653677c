use serde::Serialize;
use time::{macros::format_description, OffsetDateTime};

use super::Page;
use crate::auth::repo_types::User;
use crate::support::repo_types::{Ticket, TicketMessage, TicketStatus, TicketSummary};
use crate::todos::repo_types::{Todo, TodoWithOwner};

pub fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(format_description!("[year]-[month]-[day] [hour]:[minute] UTC"))
        .unwrap_or_default()
}

/// Header bar: who is logged in and whether to link the admin panel.
#[derive(Debug, Serialize)]
pub struct Nav {
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for Nav {
    fn from(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            is_admin: u.is_admin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub csrf_token: String,
    pub username: String,
    pub error: Option<String>,
}

impl Page for LoginPage {
    const TEMPLATE: &'static str = "login.html";
}

#[derive(Debug, Serialize)]
pub struct RegisterPage {
    pub csrf_token: String,
    pub username: String,
    pub error: Option<String>,
}

impl Page for RegisterPage {
    const TEMPLATE: &'static str = "register.html";
}

#[derive(Debug, Serialize)]
pub struct TodoView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub owner: Option<String>,
}

impl From<Todo> for TodoView {
    fn from(t: Todo) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            completed: t.completed,
            owner: None,
        }
    }
}

impl From<TodoWithOwner> for TodoView {
    fn from(t: TodoWithOwner) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            completed: t.completed,
            owner: Some(t.owner_username),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TodosPage {
    pub nav: Nav,
    pub csrf_token: String,
    pub todos: Vec<TodoView>,
}

impl Page for TodosPage {
    const TEMPLATE: &'static str = "todos.html";
}

#[derive(Debug, Serialize)]
pub struct TicketView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub created_at: String,
    pub username: Option<String>,
}

impl From<Ticket> for TicketView {
    fn from(t: Ticket) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            status: t.status.as_str(),
            status_label: t.status.label(),
            created_at: format_timestamp(t.created_at),
            username: None,
        }
    }
}

impl From<TicketSummary> for TicketView {
    fn from(t: TicketSummary) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: String::new(),
            status: t.status.as_str(),
            status_label: t.status.label(),
            created_at: format_timestamp(t.created_at),
            username: Some(t.username),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub sender: String,
    pub message: String,
    pub created_at: String,
}

impl From<TicketMessage> for MessageView {
    fn from(m: TicketMessage) -> Self {
        Self {
            sender: m.sender_username,
            message: m.message,
            created_at: format_timestamp(m.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub fn status_options(current: TicketStatus) -> Vec<StatusOption> {
    TicketStatus::ALL
        .into_iter()
        .map(|st| StatusOption {
            value: st.as_str(),
            label: st.label(),
            selected: st == current,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SupportPage {
    pub nav: Nav,
    pub csrf_token: String,
    pub tickets: Vec<TicketView>,
}

impl Page for SupportPage {
    const TEMPLATE: &'static str = "support.html";
}

/// One ticket with its thread. `statuses` is only filled for admins, who get
/// the reply form.
#[derive(Debug, Serialize)]
pub struct TicketPage {
    pub nav: Nav,
    pub csrf_token: String,
    pub ticket: TicketView,
    pub messages: Vec<MessageView>,
    pub statuses: Vec<StatusOption>,
}

impl Page for TicketPage {
    const TEMPLATE: &'static str = "ticket.html";
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            is_admin: u.is_admin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminPage {
    pub nav: Nav,
    pub csrf_token: String,
    pub q: String,
    pub users: Vec<UserView>,
    pub todos: Vec<TodoView>,
    pub tickets: Vec<TicketView>,
}

impl Page for AdminPage {
    const TEMPLATE: &'static str = "admin.html";
}

#[derive(Debug, Serialize)]
pub struct AdminUserEditPage {
    pub nav: Nav,
    pub csrf_token: String,
    pub user: UserView,
    pub error: Option<String>,
}

impl Page for AdminUserEditPage {
    const TEMPLATE: &'static str = "admin_user_edit.html";
}

#[derive(Debug, Serialize)]
pub struct AdminTodoEditPage {
    pub nav: Nav,
    pub csrf_token: String,
    pub todo: TodoView,
}

impl Page for AdminTodoEditPage {
    const TEMPLATE: &'static str = "admin_todo_edit.html";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::Views;

    #[test]
    fn timestamps_render_in_utc() {
        let ts = OffsetDateTime::from_unix_timestamp(0).unwrap();
        assert_eq!(format_timestamp(ts), "1970-01-01 00:00 UTC");
    }

    #[test]
    fn status_options_mark_current() {
        let opts = status_options(TicketStatus::Resolved);
        assert_eq!(opts.len(), 4);
        assert_eq!(opts.iter().filter(|o| o.selected).count(), 1);
        assert!(opts.iter().any(|o| o.selected && o.value == "resolved"));
    }

    #[test]
    fn todos_page_escapes_user_content() {
        let views = Views::new().expect("templates parse");
        let page = TodosPage {
            nav: Nav {
                username: "alice".into(),
                is_admin: false,
            },
            csrf_token: "tok".into(),
            todos: vec![TodoView {
                id: 7,
                title: "<script>alert(1)</script>".into(),
                description: String::new(),
                completed: false,
                owner: None,
            }],
        };
        let html = views.render(&page).unwrap().0;
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("/complete/7?csrf_token=tok"));
    }
}
