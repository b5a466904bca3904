use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, new: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<User>;
    /// Removes the user together with their posts, comments and follow rows.
    async fn delete_user(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait GroupRepo: Send + Sync {
    async fn list_groups(&self) -> RepoResult<Vec<Group>>;
    async fn create_group(&self, new: NewGroup) -> RepoResult<Group>;
    async fn get_group(&self, id: Id) -> RepoResult<Group>;
    async fn get_group_by_slug(&self, slug: &str) -> RepoResult<Group>;
    /// Removes the group; its posts survive with no group.
    async fn delete_group(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn count_posts(&self, filter: PostFilter) -> RepoResult<u64>;
    /// Newest first (pub_date desc, id desc).
    async fn list_posts(&self, filter: PostFilter, offset: u64, limit: u64) -> RepoResult<Vec<Post>>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    async fn create_post(&self, new: NewPost) -> RepoResult<Post>;
    async fn update_post(&self, id: Id, upd: PostUpdate) -> RepoResult<Post>;
    /// Removes the post and its comments.
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Oldest first.
    async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<Comment>>;
    async fn create_comment(&self, new: NewComment) -> RepoResult<Comment>;
}

#[async_trait]
pub trait FollowRepo: Send + Sync {
    async fn follow_exists(&self, user_id: Id, author_id: Id) -> RepoResult<bool>;
    /// Inserts a row unconditionally; callers decide whether one is wanted.
    async fn create_follow(&self, user_id: Id, author_id: Id) -> RepoResult<Follow>;
    /// Deletes every matching row and returns how many went away.
    async fn delete_follows(&self, user_id: Id, author_id: Id) -> RepoResult<u64>;
}

pub trait Repo: UserRepo + GroupRepo + PostRepo + CommentRepo + FollowRepo {}

impl<T> Repo for T where T: UserRepo + GroupRepo + PostRepo + CommentRepo + FollowRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
    use tracing::{info, warn};

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: HashMap<Id, User>,
        groups: HashMap<Id, Group>,
        posts: HashMap<Id, Post>,
        comments: HashMap<Id, Comment>,
        follows: HashMap<Id, Follow>,
        next_id: Id,
    }

    impl State {
        fn next_id(&mut self) -> Id {
            self.next_id += 1;
            self.next_id
        }

        fn matches(&self, filter: PostFilter, followed: &HashSet<Id>, post: &Post) -> bool {
            match filter {
                PostFilter::All => true,
                PostFilter::Group(g) => post.group_id == Some(g),
                PostFilter::Author(a) => post.author_id == a,
                PostFilter::FollowedBy(_) => followed.contains(&post.author_id),
            }
        }

        fn followed_by(&self, filter: PostFilter) -> HashSet<Id> {
            match filter {
                PostFilter::FollowedBy(user_id) => self
                    .follows
                    .values()
                    .filter(|f| f.user_id == user_id)
                    .map(|f| f.author_id)
                    .collect(),
                _ => HashSet::new(),
            }
        }

        fn filtered(&self, filter: PostFilter) -> Vec<&Post> {
            let followed = self.followed_by(filter);
            let mut v: Vec<&Post> = self
                .posts
                .values()
                .filter(|p| self.matches(filter, &followed, p))
                .collect();
            v.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
            v
        }
    }

    /// Process-local repository. With a snapshot path every write is mirrored
    /// to a JSON file that is read back on startup.
    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
        }

        pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
            let path = path.into();
            let state = Self::load_state_from(&path);
            Self { state: Arc::new(RwLock::new(state)), snapshot_path: Some(Arc::new(path)) }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        info!("loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        warn!("failed to parse snapshot '{}': {e}; starting empty", path.display());
                        State::default()
                    }
                },
                Err(e) => {
                    info!("no snapshot at '{}' ({e}); starting empty", path.display());
                    State::default()
                }
            }
        }

        fn persist(&self) {
            let Some(path) = self.snapshot_path.as_ref() else { return };
            let bytes = match self.state.read() {
                Ok(s) => serde_json::to_vec_pretty(&*s),
                Err(_) => return,
            };
            match bytes {
                Ok(bytes) => {
                    if let Some(dir) = path.parent() {
                        let _ = std::fs::create_dir_all(dir);
                    }
                    if let Err(e) = std::fs::write(path.as_path(), bytes) {
                        warn!("failed to write snapshot '{}': {e}", path.display());
                    }
                }
                Err(e) => warn!("failed to serialise snapshot: {e}"),
            }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.users.values().any(|u| u.username == new.username) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let user = User {
                id,
                username: new.username,
                password_hash: new.password_hash,
                is_admin: new.is_admin,
                date_joined: Utc::now(),
            };
            s.users.insert(id, user.clone());
            drop(s);
            self.persist();
            Ok(user)
        }

        async fn get_user(&self, id: Id) -> RepoResult<User> {
            self.read()?.users.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn get_user_by_username(&self, username: &str) -> RepoResult<User> {
            let s = self.read()?;
            s.users.values().find(|u| u.username == username).cloned().ok_or(RepoError::NotFound)
        }

        async fn delete_user(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.users.remove(&id).ok_or(RepoError::NotFound)?;
            s.posts.retain(|_, p| p.author_id != id);
            let State { posts, comments, follows, .. } = &mut *s;
            comments.retain(|_, c| c.author_id != id && posts.contains_key(&c.post_id));
            follows.retain(|_, f| f.user_id != id && f.author_id != id);
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl GroupRepo for InMemRepo {
        async fn list_groups(&self) -> RepoResult<Vec<Group>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.groups.values().cloned().collect();
            v.sort_by(|a, b| a.title.cmp(&b.title));
            Ok(v)
        }

        async fn create_group(&self, new: NewGroup) -> RepoResult<Group> {
            let mut s = self.write()?;
            if s.groups.values().any(|g| g.slug == new.slug) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let group = Group { id, title: new.title, slug: new.slug, description: new.description };
            s.groups.insert(id, group.clone());
            drop(s);
            self.persist();
            Ok(group)
        }

        async fn get_group(&self, id: Id) -> RepoResult<Group> {
            self.read()?.groups.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn get_group_by_slug(&self, slug: &str) -> RepoResult<Group> {
            let s = self.read()?;
            s.groups.values().find(|g| g.slug == slug).cloned().ok_or(RepoError::NotFound)
        }

        async fn delete_group(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.groups.remove(&id).ok_or(RepoError::NotFound)?;
            for post in s.posts.values_mut().filter(|p| p.group_id == Some(id)) {
                post.group_id = None;
                post.group_slug = None;
            }
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn count_posts(&self, filter: PostFilter) -> RepoResult<u64> {
            Ok(self.read()?.filtered(filter).len() as u64)
        }

        async fn list_posts(&self, filter: PostFilter, offset: u64, limit: u64) -> RepoResult<Vec<Post>> {
            let s = self.read()?;
            Ok(s.filtered(filter)
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            self.read()?.posts.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let mut s = self.write()?;
            let author = s.users.get(&new.author_id).ok_or(RepoError::NotFound)?.username.clone();
            let group_slug = match new.group_id {
                Some(g) => Some(s.groups.get(&g).ok_or(RepoError::NotFound)?.slug.clone()),
                None => None,
            };
            let id = s.next_id();
            let post = Post {
                id,
                text: new.text,
                pub_date: Utc::now(),
                author_id: new.author_id,
                author,
                group_id: new.group_id,
                group_slug,
                image: new.image,
            };
            s.posts.insert(id, post.clone());
            drop(s);
            self.persist();
            Ok(post)
        }

        async fn update_post(&self, id: Id, upd: PostUpdate) -> RepoResult<Post> {
            let mut s = self.write()?;
            let group_slug = match upd.group_id {
                Some(g) => Some(s.groups.get(&g).ok_or(RepoError::NotFound)?.slug.clone()),
                None => None,
            };
            let post = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            post.text = upd.text;
            post.group_id = upd.group_id;
            post.group_slug = group_slug;
            if let Some(image) = upd.image { post.image = Some(image); }
            let updated = post.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }

        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.posts.remove(&id).ok_or(RepoError::NotFound)?;
            s.comments.retain(|_, c| c.post_id != id);
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<Comment>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.comments
                .values()
                .filter(|c| c.post_id == post_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
            Ok(v)
        }

        async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
            let mut s = self.write()?;
            if !s.posts.contains_key(&new.post_id) { return Err(RepoError::NotFound); }
            let author = s.users.get(&new.author_id).ok_or(RepoError::NotFound)?.username.clone();
            let id = s.next_id();
            let comment = Comment {
                id,
                post_id: new.post_id,
                author_id: new.author_id,
                author,
                text: new.text,
                created: Utc::now(),
            };
            s.comments.insert(id, comment.clone());
            drop(s);
            self.persist();
            Ok(comment)
        }
    }

    #[async_trait]
    impl FollowRepo for InMemRepo {
        async fn follow_exists(&self, user_id: Id, author_id: Id) -> RepoResult<bool> {
            let s = self.read()?;
            Ok(s.follows.values().any(|f| f.user_id == user_id && f.author_id == author_id))
        }

        async fn create_follow(&self, user_id: Id, author_id: Id) -> RepoResult<Follow> {
            let mut s = self.write()?;
            if !s.users.contains_key(&user_id) || !s.users.contains_key(&author_id) {
                return Err(RepoError::NotFound);
            }
            let id = s.next_id();
            let follow = Follow { id, user_id, author_id };
            s.follows.insert(id, follow.clone());
            drop(s);
            self.persist();
            Ok(follow)
        }

        async fn delete_follows(&self, user_id: Id, author_id: Id) -> RepoResult<u64> {
            let mut s = self.write()?;
            let before = s.follows.len();
            s.follows.retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
            let removed = (before - s.follows.len()) as u64;
            drop(s);
            if removed > 0 { self.persist(); }
            Ok(removed)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    const POST_SELECT: &str = r#"
        SELECT p.id, p.text, p.pub_date, p.author_id, u.username AS author,
               p.group_id, g.slug AS group_slug, p.image
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN post_groups g ON g.id = p.group_id"#;

    const COMMENT_SELECT: &str = r#"
        SELECT c.id, c.post_id, c.author_id, u.username AS author, c.text, c.created
        FROM comments c
        JOIN users u ON u.id = c.author_id"#;

    fn map_err(e: sqlx::Error) -> RepoError {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => RepoError::Conflict,  // unique_violation
                Some("23503") => RepoError::NotFound,  // foreign_key_violation
                _ => RepoError::Internal(e.to_string()),
            },
            _ => RepoError::Internal(e.to_string()),
        }
    }

    fn affected(rows: u64) -> RepoResult<()> {
        if rows == 0 { Err(RepoError::NotFound) } else { Ok(()) }
    }

    /// WHERE clause for a listing filter; the filter key, when any, is `$1`.
    fn filter_clause(filter: PostFilter) -> (&'static str, Option<Id>) {
        match filter {
            PostFilter::All => ("TRUE", None),
            PostFilter::Group(id) => ("p.group_id = $1", Some(id)),
            PostFilter::Author(id) => ("p.author_id = $1", Some(id)),
            PostFilter::FollowedBy(id) => {
                ("p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = $1)", Some(id))
            }
        }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<User> {
            sqlx::query_as::<_, User>(
                "INSERT INTO users (username, password_hash, is_admin) VALUES ($1,$2,$3) \
                 RETURNING id, username, password_hash, is_admin, date_joined",
            )
            .bind(&new.username).bind(&new.password_hash).bind(new.is_admin)
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn get_user(&self, id: Id) -> RepoResult<User> {
            sqlx::query_as::<_, User>("SELECT id, username, password_hash, is_admin, date_joined FROM users WHERE id=$1")
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn get_user_by_username(&self, username: &str) -> RepoResult<User> {
            sqlx::query_as::<_, User>("SELECT id, username, password_hash, is_admin, date_joined FROM users WHERE username=$1")
                .bind(username)
                .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn delete_user(&self, id: Id) -> RepoResult<()> {
            // posts, comments and follows go with it through ON DELETE CASCADE
            let res = sqlx::query("DELETE FROM users WHERE id=$1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            affected(res.rows_affected())
        }
    }

    #[async_trait]
    impl GroupRepo for PgRepo {
        async fn list_groups(&self) -> RepoResult<Vec<Group>> {
            sqlx::query_as::<_, Group>("SELECT id, title, slug, description FROM post_groups ORDER BY title")
                .fetch_all(&self.pool).await.map_err(map_err)
        }

        async fn create_group(&self, new: NewGroup) -> RepoResult<Group> {
            sqlx::query_as::<_, Group>(
                "INSERT INTO post_groups (title, slug, description) VALUES ($1,$2,$3) RETURNING id, title, slug, description",
            )
            .bind(&new.title).bind(&new.slug).bind(&new.description)
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn get_group(&self, id: Id) -> RepoResult<Group> {
            sqlx::query_as::<_, Group>("SELECT id, title, slug, description FROM post_groups WHERE id=$1")
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn get_group_by_slug(&self, slug: &str) -> RepoResult<Group> {
            sqlx::query_as::<_, Group>("SELECT id, title, slug, description FROM post_groups WHERE slug=$1")
                .bind(slug)
                .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn delete_group(&self, id: Id) -> RepoResult<()> {
            // posts.group_id is ON DELETE SET NULL
            let res = sqlx::query("DELETE FROM post_groups WHERE id=$1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            affected(res.rows_affected())
        }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn count_posts(&self, filter: PostFilter) -> RepoResult<u64> {
            let (clause, key) = filter_clause(filter);
            let sql = format!("SELECT COUNT(*) FROM posts p WHERE {clause}");
            let mut q = sqlx::query_scalar::<_, i64>(&sql);
            if let Some(key) = key { q = q.bind(key); }
            let n = q.fetch_one(&self.pool).await.map_err(map_err)?;
            Ok(n.max(0) as u64)
        }

        async fn list_posts(&self, filter: PostFilter, offset: u64, limit: u64) -> RepoResult<Vec<Post>> {
            let (clause, key) = filter_clause(filter);
            let first = if key.is_some() { 2 } else { 1 };
            let sql = format!(
                "{POST_SELECT} WHERE {clause} ORDER BY p.pub_date DESC, p.id DESC LIMIT ${} OFFSET ${}",
                first,
                first + 1
            );
            let mut q = sqlx::query_as::<_, Post>(&sql);
            if let Some(key) = key { q = q.bind(key); }
            q.bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool).await.map_err(map_err)
        }

        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            let sql = format!("{POST_SELECT} WHERE p.id = $1");
            sqlx::query_as::<_, Post>(&sql)
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let id: Id = sqlx::query_scalar(
                "INSERT INTO posts (text, author_id, group_id, image) VALUES ($1,$2,$3,$4) RETURNING id",
            )
            .bind(&new.text).bind(new.author_id).bind(new.group_id).bind(new.image.as_ref())
            .fetch_one(&self.pool).await.map_err(map_err)?;
            self.get_post(id).await
        }

        async fn update_post(&self, id: Id, upd: PostUpdate) -> RepoResult<Post> {
            let res = sqlx::query(
                "UPDATE posts SET text=$2, group_id=$3, image=COALESCE($4, image) WHERE id=$1",
            )
            .bind(id).bind(&upd.text).bind(upd.group_id).bind(upd.image.as_ref())
            .execute(&self.pool).await.map_err(map_err)?;
            affected(res.rows_affected())?;
            self.get_post(id).await
        }

        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM posts WHERE id=$1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            affected(res.rows_affected())
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<Comment>> {
            let sql = format!("{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created ASC, c.id ASC");
            sqlx::query_as::<_, Comment>(&sql)
                .bind(post_id)
                .fetch_all(&self.pool).await.map_err(map_err)
        }

        async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
            let id: Id = sqlx::query_scalar(
                "INSERT INTO comments (post_id, author_id, text) VALUES ($1,$2,$3) RETURNING id",
            )
            .bind(new.post_id).bind(new.author_id).bind(&new.text)
            .fetch_one(&self.pool).await.map_err(map_err)?;
            let sql = format!("{COMMENT_SELECT} WHERE c.id = $1");
            sqlx::query_as::<_, Comment>(&sql)
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }
    }

    #[async_trait]
    impl FollowRepo for PgRepo {
        async fn follow_exists(&self, user_id: Id, author_id: Id) -> RepoResult<bool> {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id=$1 AND author_id=$2)",
            )
            .bind(user_id).bind(author_id)
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn create_follow(&self, user_id: Id, author_id: Id) -> RepoResult<Follow> {
            sqlx::query_as::<_, Follow>(
                "INSERT INTO follows (user_id, author_id) VALUES ($1,$2) RETURNING id, user_id, author_id",
            )
            .bind(user_id).bind(author_id)
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn delete_follows(&self, user_id: Id, author_id: Id) -> RepoResult<u64> {
            let res = sqlx::query("DELETE FROM follows WHERE user_id=$1 AND author_id=$2")
                .bind(user_id).bind(author_id)
                .execute(&self.pool).await.map_err(map_err)?;
            Ok(res.rows_affected())
        }
    }
}
