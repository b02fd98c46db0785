use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::models::*;
use super::{Datastore, StoreError};

/// In-memory datastore used by the test suite and for local development
/// without a database. Enforces the same uniqueness and referential rules
/// as the Postgres schema so entity clients observe identical error
/// signals from both implementations.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    roles: Vec<Role>,
    users: Vec<User>,
    tags: Vec<Tag>,
    ideas: Vec<Idea>,
    comments: Vec<Comment>,
    likes: Vec<Like>,
    /// (idea_id, tag_id)
    idea_tags: Vec<(i64, i64)>,
    /// (tag_id, user_id)
    subscriptions: Vec<(i64, i64)>,
    next_role: i64,
    next_user: i64,
    next_tag: i64,
    next_idea: i64,
    next_comment: i64,
    next_like: i64,
}

impl Tables {
    fn has_user(&self, id: i64) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn has_tag(&self, id: i64) -> bool {
        self.tags.iter().any(|t| t.id == id)
    }

    fn has_idea(&self, id: i64) -> bool {
        self.ideas.iter().any(|i| i.id == id)
    }

    /// Referential cleanup for one idea: its comments, likes and tag links.
    fn drop_idea_relations(&mut self, idea_id: i64) {
        self.comments.retain(|c| c.idea_id != idea_id);
        self.likes.retain(|l| l.idea_id != idea_id);
        self.idea_tags.retain(|(i, _)| *i != idea_id);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[async_trait]
impl Datastore for MemoryStore {
    // --- roles ---

    async fn role(&self, id: i64) -> Result<Option<Role>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self.inner.read().await.roles.clone())
    }

    async fn insert_role(&self, name: &str) -> Result<Role, StoreError> {
        let mut t = self.inner.write().await;
        let role = Role { id: next(&mut t.next_role), name: name.to_string() };
        t.roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: i64, name: &str) -> Result<Option<Role>, StoreError> {
        let mut t = self.inner.write().await;
        match t.roles.iter_mut().find(|r| r.id == id) {
            Some(role) => {
                role.name = name.to_string();
                Ok(Some(role.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_role(&self, id: i64) -> Result<Option<Role>, StoreError> {
        let mut t = self.inner.write().await;
        if t.users.iter().any(|u| u.role_id == id) {
            return Err(StoreError::ForeignKeyViolation("users_role_id_fkey".to_string()));
        }
        let pos = t.roles.iter().position(|r| r.id == id);
        Ok(pos.map(|p| t.roles.remove(p)))
    }

    async fn users_for_role(&self, role_id: i64) -> Result<Vec<User>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.users.iter().filter(|u| u.role_id == role_id).cloned().collect())
    }

    // --- users ---

    async fn user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.read().await.users.clone())
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut t = self.inner.write().await;
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }
        if !t.roles.iter().any(|r| r.id == new.role_id) {
            return Err(StoreError::ForeignKeyViolation("users_role_id_fkey".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: next(&mut t.next_user),
            name: new.name,
            email: new.email,
            password: new.password,
            role_id: new.role_id,
            profile_img: new.profile_img,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut t = self.inner.write().await;
        if let Some(email) = &patch.email {
            if t.users.iter().any(|u| u.email == *email && u.id != id) {
                return Err(StoreError::UniqueViolation("users_email_key".to_string()));
            }
        }
        if let Some(role_id) = patch.role_id {
            if !t.roles.iter().any(|r| r.id == role_id) {
                return Err(StoreError::ForeignKeyViolation("users_role_id_fkey".to_string()));
            }
        }
        match t.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                if let Some(name) = patch.name {
                    user.name = name;
                }
                if let Some(email) = patch.email {
                    user.email = email;
                }
                if let Some(password) = patch.password {
                    user.password = password;
                }
                if let Some(role_id) = patch.role_id {
                    user.role_id = role_id;
                }
                if let Some(profile_img) = patch.profile_img {
                    user.profile_img = profile_img;
                }
                user.updated_at = Utc::now();
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let mut t = self.inner.write().await;
        let pos = match t.users.iter().position(|u| u.id == id) {
            Some(p) => p,
            None => return Ok(None),
        };
        let user = t.users.remove(pos);
        let owned: Vec<i64> =
            t.ideas.iter().filter(|i| i.user_id == id).map(|i| i.id).collect();
        for idea_id in owned {
            t.ideas.retain(|i| i.id != idea_id);
            t.drop_idea_relations(idea_id);
        }
        t.comments.retain(|c| c.user_id != id);
        t.likes.retain(|l| l.user_id != id);
        t.subscriptions.retain(|(_, u)| *u != id);
        Ok(Some(user))
    }

    // --- tags ---

    async fn tag(&self, id: i64) -> Result<Option<Tag>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.tags.iter().find(|tag| tag.id == id).cloned())
    }

    async fn tag_by_name(&self, name: &str) -> Result<Option<Tag>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.tags.iter().find(|tag| tag.name == name).cloned())
    }

    async fn tags(&self) -> Result<Vec<Tag>, StoreError> {
        Ok(self.inner.read().await.tags.clone())
    }

    async fn tags_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.tags.iter().filter(|tag| ids.contains(&tag.id)).cloned().collect())
    }

    async fn insert_tag(&self, new: NewTag) -> Result<Tag, StoreError> {
        let mut t = self.inner.write().await;
        if t.tags.iter().any(|tag| tag.name == new.name) {
            return Err(StoreError::UniqueViolation("tags_name_key".to_string()));
        }
        let tag = Tag { id: next(&mut t.next_tag), name: new.name, description: new.description };
        t.tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, patch: TagPatch) -> Result<Option<Tag>, StoreError> {
        let mut t = self.inner.write().await;
        if let Some(name) = &patch.name {
            if t.tags.iter().any(|tag| tag.name == *name && tag.id != id) {
                return Err(StoreError::UniqueViolation("tags_name_key".to_string()));
            }
        }
        match t.tags.iter_mut().find(|tag| tag.id == id) {
            Some(tag) => {
                if let Some(name) = patch.name {
                    tag.name = name;
                }
                if let Some(description) = patch.description {
                    tag.description = description;
                }
                Ok(Some(tag.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_tag(&self, id: i64) -> Result<Option<Tag>, StoreError> {
        let mut t = self.inner.write().await;
        let pos = match t.tags.iter().position(|tag| tag.id == id) {
            Some(p) => p,
            None => return Ok(None),
        };
        let tag = t.tags.remove(pos);
        t.idea_tags.retain(|(_, tg)| *tg != id);
        t.subscriptions.retain(|(tg, _)| *tg != id);
        Ok(Some(tag))
    }

    // --- tag subscriptions ---

    async fn insert_subscription(&self, tag_id: i64, user_id: i64) -> Result<(), StoreError> {
        let mut t = self.inner.write().await;
        if !t.has_tag(tag_id) {
            return Err(StoreError::ForeignKeyViolation(
                "tag_subscriptions_tag_id_fkey".to_string(),
            ));
        }
        if !t.has_user(user_id) {
            return Err(StoreError::ForeignKeyViolation(
                "tag_subscriptions_user_id_fkey".to_string(),
            ));
        }
        if t.subscriptions.contains(&(tag_id, user_id)) {
            return Err(StoreError::UniqueViolation("tag_subscriptions_pkey".to_string()));
        }
        t.subscriptions.push((tag_id, user_id));
        Ok(())
    }

    async fn delete_subscription(&self, tag_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let mut t = self.inner.write().await;
        let before = t.subscriptions.len();
        t.subscriptions.retain(|pair| *pair != (tag_id, user_id));
        Ok(t.subscriptions.len() < before)
    }

    async fn subscribers(&self, tag_id: i64) -> Result<Vec<User>, StoreError> {
        let t = self.inner.read().await;
        let ids: Vec<i64> =
            t.subscriptions.iter().filter(|(tg, _)| *tg == tag_id).map(|(_, u)| *u).collect();
        Ok(t.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    // --- ideas ---

    async fn idea(&self, id: i64) -> Result<Option<Idea>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.ideas.iter().find(|i| i.id == id).cloned())
    }

    async fn ideas(&self, query: IdeaQuery) -> Result<Vec<Idea>, StoreError> {
        let t = self.inner.read().await;
        let mut rows: Vec<Idea> = t
            .ideas
            .iter()
            .filter(|idea| {
                query.tag_ids.is_empty()
                    || t.idea_tags
                        .iter()
                        .any(|(i, tg)| *i == idea.id && query.tag_ids.contains(tg))
            })
            .cloned()
            .collect();

        if let Some(sort) = query.sort {
            let count = |idea_id: i64, sort: IdeaSort| -> i64 {
                match sort {
                    IdeaSort::Likes => {
                        t.likes.iter().filter(|l| l.idea_id == idea_id).count() as i64
                    }
                    IdeaSort::Comments => {
                        t.comments.iter().filter(|c| c.idea_id == idea_id).count() as i64
                    }
                    IdeaSort::Date => 0,
                }
            };
            rows.sort_by(|a, b| {
                let ord = match sort {
                    IdeaSort::Date => a.created_at.cmp(&b.created_at),
                    _ => count(a.id, sort).cmp(&count(b.id, sort)),
                };
                let ord = match query.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                ord.then(a.id.cmp(&b.id))
            });
        }

        let start = query.page.saturating_mul(query.per_page).max(0) as usize;
        Ok(rows.into_iter().skip(start).take(query.per_page as usize).collect())
    }

    async fn ideas_for_user(&self, user_id: i64) -> Result<Vec<Idea>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.ideas.iter().filter(|i| i.user_id == user_id).cloned().collect())
    }

    async fn insert_idea(&self, new: NewIdea) -> Result<Idea, StoreError> {
        let mut t = self.inner.write().await;
        if !t.has_user(new.user_id) {
            return Err(StoreError::ForeignKeyViolation("ideas_user_id_fkey".to_string()));
        }
        let now = Utc::now();
        let idea = Idea {
            id: next(&mut t.next_idea),
            title: new.title,
            content: new.content,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        t.ideas.push(idea.clone());
        Ok(idea)
    }

    async fn update_idea(&self, id: i64, patch: IdeaPatch) -> Result<Option<Idea>, StoreError> {
        let mut t = self.inner.write().await;
        match t.ideas.iter_mut().find(|i| i.id == id) {
            Some(idea) => {
                idea.title = patch.title;
                idea.content = patch.content;
                idea.updated_at = Utc::now();
                Ok(Some(idea.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_idea(&self, id: i64) -> Result<Option<Idea>, StoreError> {
        let mut t = self.inner.write().await;
        let pos = match t.ideas.iter().position(|i| i.id == id) {
            Some(p) => p,
            None => return Ok(None),
        };
        let idea = t.ideas.remove(pos);
        t.drop_idea_relations(id);
        Ok(Some(idea))
    }

    // --- idea <-> tag associations ---

    async fn idea_tags(&self, idea_id: i64) -> Result<Vec<Tag>, StoreError> {
        let t = self.inner.read().await;
        let ids: Vec<i64> =
            t.idea_tags.iter().filter(|(i, _)| *i == idea_id).map(|(_, tg)| *tg).collect();
        Ok(t.tags.iter().filter(|tag| ids.contains(&tag.id)).cloned().collect())
    }

    async fn link_idea_tags(&self, idea_id: i64, tag_ids: &[i64]) -> Result<(), StoreError> {
        let mut t = self.inner.write().await;
        if !t.has_idea(idea_id) {
            return Err(StoreError::ForeignKeyViolation("idea_tags_idea_id_fkey".to_string()));
        }
        for tag_id in tag_ids {
            if !t.has_tag(*tag_id) {
                return Err(StoreError::ForeignKeyViolation("idea_tags_tag_id_fkey".to_string()));
            }
            if !t.idea_tags.contains(&(idea_id, *tag_id)) {
                t.idea_tags.push((idea_id, *tag_id));
            }
        }
        Ok(())
    }

    async fn relink_idea_tags(&self, idea_id: i64, tag_ids: &[i64]) -> Result<bool, StoreError> {
        // Single write lock makes clear+recreate atomic against other
        // writers, mirroring the Postgres transaction.
        let mut t = self.inner.write().await;
        if !t.has_idea(idea_id) {
            return Ok(false);
        }
        for tag_id in tag_ids {
            if !t.has_tag(*tag_id) {
                return Err(StoreError::ForeignKeyViolation("idea_tags_tag_id_fkey".to_string()));
            }
        }
        t.idea_tags.retain(|(i, _)| *i != idea_id);
        for tag_id in tag_ids {
            t.idea_tags.push((idea_id, *tag_id));
        }
        Ok(true)
    }

    // --- comments ---

    async fn comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn comments(&self) -> Result<Vec<Comment>, StoreError> {
        Ok(self.inner.read().await.comments.clone())
    }

    async fn comments_for_idea(&self, idea_id: i64) -> Result<Vec<Comment>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.comments.iter().filter(|c| c.idea_id == idea_id).cloned().collect())
    }

    async fn comments_for_user(&self, user_id: i64) -> Result<Vec<Comment>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.comments.iter().filter(|c| c.user_id == user_id).cloned().collect())
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let mut t = self.inner.write().await;
        if !t.has_idea(new.idea_id) {
            return Err(StoreError::ForeignKeyViolation("comments_idea_id_fkey".to_string()));
        }
        if !t.has_user(new.user_id) {
            return Err(StoreError::ForeignKeyViolation("comments_user_id_fkey".to_string()));
        }
        let now = Utc::now();
        let comment = Comment {
            id: next(&mut t.next_comment),
            content: new.content,
            idea_id: new.idea_id,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>, StoreError> {
        let mut t = self.inner.write().await;
        match t.comments.iter_mut().find(|c| c.id == id) {
            Some(comment) => {
                comment.content = content.to_string();
                comment.updated_at = Utc::now();
                Ok(Some(comment.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let mut t = self.inner.write().await;
        let pos = t.comments.iter().position(|c| c.id == id);
        Ok(pos.map(|p| t.comments.remove(p)))
    }

    // --- likes ---

    async fn like(&self, id: i64) -> Result<Option<Like>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.likes.iter().find(|l| l.id == id).cloned())
    }

    async fn likes(&self) -> Result<Vec<Like>, StoreError> {
        Ok(self.inner.read().await.likes.clone())
    }

    async fn likes_for_idea(&self, idea_id: i64) -> Result<Vec<Like>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.likes.iter().filter(|l| l.idea_id == idea_id).cloned().collect())
    }

    async fn likes_for_user(&self, user_id: i64) -> Result<Vec<Like>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.likes.iter().filter(|l| l.user_id == user_id).cloned().collect())
    }

    async fn insert_like(&self, idea_id: i64, user_id: i64) -> Result<Like, StoreError> {
        let mut t = self.inner.write().await;
        if !t.has_idea(idea_id) {
            return Err(StoreError::ForeignKeyViolation("likes_idea_id_fkey".to_string()));
        }
        if !t.has_user(user_id) {
            return Err(StoreError::ForeignKeyViolation("likes_user_id_fkey".to_string()));
        }
        if t.likes.iter().any(|l| l.idea_id == idea_id && l.user_id == user_id) {
            return Err(StoreError::UniqueViolation("likes_idea_id_user_id_key".to_string()));
        }
        let like = Like { id: next(&mut t.next_like), idea_id, user_id, created_at: Utc::now() };
        t.likes.push(like.clone());
        Ok(like)
    }

    async fn delete_like(&self, id: i64) -> Result<Option<Like>, StoreError> {
        let mut t = self.inner.write().await;
        let pos = t.likes.iter().position(|l| l.id == id);
        Ok(pos.map(|p| t.likes.remove(p)))
    }

    async fn delete_like_by_pair(
        &self,
        idea_id: i64,
        user_id: i64,
    ) -> Result<Option<Like>, StoreError> {
        let mut t = self.inner.write().await;
        let pos = t.likes.iter().position(|l| l.idea_id == idea_id && l.user_id == user_id);
        Ok(pos.map(|p| t.likes.remove(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn like_pair_is_unique() {
        let store = MemoryStore::new();
        let role = store.insert_role("user").await.unwrap();
        let user = store
            .insert_user(NewUser {
                name: "a".into(),
                email: "a@app.com".into(),
                password: "x".into(),
                role_id: role.id,
                profile_img: String::new(),
            })
            .await
            .unwrap();
        let idea = store
            .insert_idea(NewIdea { title: "t".into(), content: "c".into(), user_id: user.id })
            .await
            .unwrap();

        store.insert_like(idea.id, user.id).await.unwrap();
        let dup = store.insert_like(idea.id, user.id).await;
        assert!(matches!(dup, Err(StoreError::UniqueViolation(_))));
        assert_eq!(store.likes_for_idea(idea.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn relink_clears_then_recreates() {
        let store = MemoryStore::new();
        let role = store.insert_role("user").await.unwrap();
        let user = store
            .insert_user(NewUser {
                name: "a".into(),
                email: "a@app.com".into(),
                password: "x".into(),
                role_id: role.id,
                profile_img: String::new(),
            })
            .await
            .unwrap();
        let t1 = store.insert_tag(NewTag { name: "one".into(), description: "".into() }).await.unwrap();
        let t2 = store.insert_tag(NewTag { name: "two".into(), description: "".into() }).await.unwrap();
        let idea = store
            .insert_idea(NewIdea { title: "t".into(), content: "c".into(), user_id: user.id })
            .await
            .unwrap();
        store.link_idea_tags(idea.id, &[t1.id]).await.unwrap();

        assert!(store.relink_idea_tags(idea.id, &[t2.id]).await.unwrap());
        let tags = store.idea_tags(idea.id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, t2.id);
    }

    #[tokio::test]
    async fn tag_names_are_unique() {
        let store = MemoryStore::new();
        let first = store
            .insert_tag(NewTag { name: "infra".into(), description: "".into() })
            .await
            .unwrap();
        let dup = store.insert_tag(NewTag { name: "infra".into(), description: "".into() }).await;
        assert!(matches!(dup, Err(StoreError::UniqueViolation(_))));

        let other = store
            .insert_tag(NewTag { name: "ops".into(), description: "".into() })
            .await
            .unwrap();
        let collide = store
            .update_tag(other.id, TagPatch { name: Some("infra".into()), description: None })
            .await;
        assert!(matches!(collide, Err(StoreError::UniqueViolation(_))));

        // renaming a tag to its own name is not a collision
        let same = store
            .update_tag(first.id, TagPatch { name: Some("infra".into()), description: None })
            .await
            .unwrap();
        assert!(same.is_some());
    }

    #[tokio::test]
    async fn deleting_user_cascades() {
        let store = MemoryStore::new();
        let role = store.insert_role("user").await.unwrap();
        let user = store
            .insert_user(NewUser {
                name: "a".into(),
                email: "a@app.com".into(),
                password: "x".into(),
                role_id: role.id,
                profile_img: String::new(),
            })
            .await
            .unwrap();
        let idea = store
            .insert_idea(NewIdea { title: "t".into(), content: "c".into(), user_id: user.id })
            .await
            .unwrap();
        store
            .insert_comment(NewComment { content: "hi".into(), idea_id: idea.id, user_id: user.id })
            .await
            .unwrap();
        store.insert_like(idea.id, user.id).await.unwrap();

        store.delete_user(user.id).await.unwrap();
        assert!(store.idea(idea.id).await.unwrap().is_none());
        assert!(store.comments().await.unwrap().is_empty());
        assert!(store.likes().await.unwrap().is_empty());
    }
}
