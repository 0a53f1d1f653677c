//! In-memory repositories for tests. Same contracts as [`PgStore`](super::PgStore),
//! including the unique username and the cascading deletes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use super::RepoError;
use crate::auth::repo::UserRepo;
use crate::auth::repo_types::User;
use crate::session::{SessionData, SessionStore};
use crate::support::repo::TicketRepo;
use crate::support::repo_types::{Ticket, TicketMessage, TicketStatus, TicketSummary};
use crate::todos::repo::TodoRepo;
use crate::todos::repo_types::{Todo, TodoWithOwner};

struct MessageRow {
    id: i64,
    ticket_id: i64,
    sender_id: i64,
    message: String,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    todos: Vec<Todo>,
    tickets: Vec<Ticket>,
    messages: Vec<MessageRow>,
    sessions: HashMap<Uuid, (SessionData, OffsetDateTime)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username(&self, id: i64) -> String {
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn session_count(&self) -> usize {
        self.tables.lock().sessions.len()
    }

    pub fn session_expiries(&self) -> Vec<OffsetDateTime> {
        let mut out: Vec<_> = self.tables.lock().sessions.values().map(|(_, exp)| *exp).collect();
        out.sort();
        out
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.tables.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .tables
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(
        &self,
        username: &str,
        hashed_password: &str,
        is_admin: bool,
    ) -> Result<User, RepoError> {
        let mut t = self.tables.lock();
        if t.users.iter().any(|u| u.username == username) {
            return Err(RepoError::Conflict);
        }
        let user = User {
            id: t.next_id(),
            username: username.to_owned(),
            hashed_password: hashed_password.to_owned(),
            is_admin,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.tables.lock().users.clone())
    }

    async fn update(
        &self,
        id: i64,
        username: &str,
        is_admin: bool,
    ) -> Result<Option<User>, RepoError> {
        let mut t = self.tables.lock();
        if t.users.iter().any(|u| u.username == username && u.id != id) {
            return Err(RepoError::Conflict);
        }
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.username = username.to_owned();
            u.is_admin = is_admin;
            u.clone()
        }))
    }

    async fn delete_cascade(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock();
        let owned_tickets: Vec<i64> = t
            .tickets
            .iter()
            .filter(|tk| tk.user_id == id)
            .map(|tk| tk.id)
            .collect();
        t.messages
            .retain(|m| m.sender_id != id && !owned_tickets.contains(&m.ticket_id));
        t.tickets.retain(|tk| tk.user_id != id);
        t.todos.retain(|td| td.owner_id != id);
        t.sessions.retain(|_, (data, _)| data.user_id != Some(id));
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        Ok(t.users.len() < before)
    }
}

#[async_trait]
impl TodoRepo for MemoryStore {
    async fn create(&self, owner_id: i64, title: &str, description: &str) -> anyhow::Result<Todo> {
        let mut t = self.tables.lock();
        let todo = Todo {
            id: t.next_id(),
            title: title.to_owned(),
            description: description.to_owned(),
            completed: false,
            owner_id,
        };
        t.todos.push(todo.clone());
        Ok(todo)
    }

    async fn list_by_owner(&self, owner_id: i64) -> anyhow::Result<Vec<Todo>> {
        Ok(self
            .tables
            .lock()
            .todos
            .iter()
            .filter(|td| td.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<TodoWithOwner>> {
        let t = self.tables.lock();
        Ok(t.todos
            .iter()
            .map(|td| TodoWithOwner {
                id: td.id,
                title: td.title.clone(),
                description: td.description.clone(),
                completed: td.completed,
                owner_id: td.owner_id,
                owner_username: t.username(td.owner_id),
            })
            .collect())
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Todo>> {
        Ok(self.tables.lock().todos.iter().find(|td| td.id == id).cloned())
    }

    async fn set_completed(&self, id: i64, completed: bool) -> anyhow::Result<bool> {
        let mut t = self.tables.lock();
        Ok(t.todos
            .iter_mut()
            .find(|td| td.id == id)
            .map(|td| td.completed = completed)
            .is_some())
    }

    async fn update(
        &self,
        id: i64,
        title: &str,
        description: &str,
        completed: bool,
    ) -> anyhow::Result<Option<Todo>> {
        let mut t = self.tables.lock();
        Ok(t.todos.iter_mut().find(|td| td.id == id).map(|td| {
            td.title = title.to_owned();
            td.description = description.to_owned();
            td.completed = completed;
            td.clone()
        }))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock();
        let before = t.todos.len();
        t.todos.retain(|td| td.id != id);
        Ok(t.todos.len() < before)
    }
}

#[async_trait]
impl TicketRepo for MemoryStore {
    async fn create(&self, user_id: i64, title: &str, description: &str) -> anyhow::Result<Ticket> {
        let mut t = self.tables.lock();
        let ticket = Ticket {
            id: t.next_id(),
            user_id,
            title: title.to_owned(),
            description: description.to_owned(),
            status: TicketStatus::Open,
            created_at: OffsetDateTime::now_utc(),
        };
        t.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn list_by_user(&self, user_id: i64) -> anyhow::Result<Vec<Ticket>> {
        let t = self.tables.lock();
        let mut rows: Vec<Ticket> = t
            .tickets
            .iter()
            .filter(|tk| tk.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<TicketSummary>> {
        let t = self.tables.lock();
        let mut rows: Vec<TicketSummary> = t
            .tickets
            .iter()
            .map(|tk| TicketSummary {
                id: tk.id,
                username: t.username(tk.user_id),
                title: tk.title.clone(),
                status: tk.status,
                created_at: tk.created_at,
            })
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Ticket>> {
        Ok(self.tables.lock().tickets.iter().find(|tk| tk.id == id).cloned())
    }

    async fn messages(&self, ticket_id: i64) -> anyhow::Result<Vec<TicketMessage>> {
        let t = self.tables.lock();
        let mut rows: Vec<&MessageRow> = t
            .messages
            .iter()
            .filter(|m| m.ticket_id == ticket_id)
            .collect();
        rows.sort_by_key(|m| (m.created_at, m.id));
        Ok(rows
            .into_iter()
            .map(|m| TicketMessage {
                sender_username: t.username(m.sender_id),
                message: m.message.clone(),
                created_at: m.created_at,
            })
            .collect())
    }

    async fn reply(
        &self,
        ticket_id: i64,
        sender_id: i64,
        message: &str,
        status: TicketStatus,
    ) -> anyhow::Result<bool> {
        let mut t = self.tables.lock();
        let Some(ticket) = t.tickets.iter_mut().find(|tk| tk.id == ticket_id) else {
            return Ok(false);
        };
        ticket.status = status;
        let id = t.next_id();
        t.messages.push(MessageRow {
            id,
            ticket_id,
            sender_id,
            message: message.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(true)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock();
        t.messages.retain(|m| m.ticket_id != id);
        let before = t.tickets.len();
        t.tickets.retain(|tk| tk.id != id);
        Ok(t.tickets.len() < before)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<SessionData>> {
        let t = self.tables.lock();
        Ok(t.sessions
            .get(&id)
            .filter(|(_, exp)| *exp > OffsetDateTime::now_utc())
            .map(|(data, _)| data.clone()))
    }

    async fn save(
        &self,
        id: Uuid,
        data: &SessionData,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let mut t = self.tables.lock();
        if let Some(user_id) = data.user_id {
            if !t.users.iter().any(|u| u.id == user_id) {
                return Ok(());
            }
        }
        t.sessions.insert(id, (data.clone(), expires_at));
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.tables.lock().sessions.remove(&id);
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let mut t = self.tables.lock();
        let now = OffsetDateTime::now_utc();
        let before = t.sessions.len();
        t.sessions.retain(|_, (_, exp)| *exp > now);
        Ok((before - t.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deleting_user_cascades_to_everything_they_own() {
        let store = MemoryStore::default();
        let alice = UserRepo::create(&store, "alice", "h", false).await.unwrap();
        let admin = UserRepo::create(&store, "admin", "h", true).await.unwrap();

        TodoRepo::create(&store, alice.id, "buy milk", "").await.unwrap();
        let ticket = TicketRepo::create(&store, alice.id, "help", "broken").await.unwrap();
        // admin's reply lives on alice's ticket and must go with it
        store.reply(ticket.id, admin.id, "on it", TicketStatus::InProgress).await.unwrap();
        store.reply(ticket.id, alice.id, "thanks", TicketStatus::InProgress).await.unwrap();
        let admin_ticket = TicketRepo::create(&store, admin.id, "note", "x").await.unwrap();
        store.reply(admin_ticket.id, alice.id, "hi", TicketStatus::Open).await.unwrap();

        assert!(store.delete_cascade(alice.id).await.unwrap());

        assert!(store.list_by_owner(alice.id).await.unwrap().is_empty());
        assert!(TicketRepo::find(&store, ticket.id).await.unwrap().is_none());
        assert!(store.messages(ticket.id).await.unwrap().is_empty());
        assert!(store.messages(admin_ticket.id).await.unwrap().is_empty());
        assert!(TicketRepo::find(&store, admin_ticket.id).await.unwrap().is_some());
        assert!(!store.delete_cascade(alice.id).await.unwrap());
    }

    #[tokio::test]
    async fn session_of_deleted_user_is_not_written_back() {
        let store = MemoryStore::default();
        let alice = UserRepo::create(&store, "alice", "h", false).await.unwrap();
        let id = Uuid::new_v4();
        let data = SessionData {
            user_id: Some(alice.id),
            csrf_token: Some("tok".into()),
        };
        let later = OffsetDateTime::now_utc() + time::Duration::hours(1);
        store.save(id, &data, later).await.unwrap();
        assert_eq!(store.load(id).await.unwrap(), Some(data.clone()));

        // admin deletes alice while her request is still running
        store.delete_cascade(alice.id).await.unwrap();
        store.save(id, &data, later).await.unwrap();
        assert_eq!(store.load(id).await.unwrap(), None);
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn expired_sessions_are_invisible() {
        let store = MemoryStore::default();
        let id = Uuid::new_v4();
        let past = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        store.save(id, &SessionData::default(), past).await.unwrap();
        assert!(store.load(id).await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
    }
}
