use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::web::Bytes;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth::{self, Auth, Role};
use crate::cache::PageCache;
use crate::config::Settings;
use crate::error::ApiError;
use crate::forms::*;
use crate::models::*;
use crate::pagination::{Page, PageQuery, Paginator};
use crate::repo::{Repo, RepoError};
use crate::require_role;
use crate::storage::{ImageStore, ImageStoreError};

pub const FEED_URL: &str = "/follow/";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/group/{slug}/").route(web::get().to(group_posts)))
        .service(web::resource("/profile/{username}/").route(web::get().to(profile)))
        .service(web::resource("/profile/{username}/follow/").route(web::get().to(profile_follow)))
        .service(web::resource("/profile/{username}/unfollow/").route(web::get().to(profile_unfollow)))
        .service(
            web::resource("/posts/{id}/")
                .route(web::get().to(post_detail))
                .route(web::post().to(add_comment)),
        )
        .service(
            web::resource("/posts/{id}/edit/")
                .route(web::get().to(post_edit_form))
                .route(web::post().to(post_edit)),
        )
        .service(web::resource("/posts/{id}/comment/").route(web::post().to(add_comment)))
        .service(
            web::resource("/create/")
                .route(web::get().to(post_create_form))
                .route(web::post().to(post_create)),
        )
        .service(web::resource(FEED_URL).route(web::get().to(follow_index)))
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/login/")
                        .route(web::get().to(login_page))
                        .route(web::post().to(login)),
                )
                .service(web::resource("/signup/").route(web::post().to(signup)))
                .service(web::resource("/logout/").route(web::get().to(logout))),
        )
        .service(
            web::scope("/admin")
                .service(web::resource("/groups/").route(web::post().to(admin_create_group)))
                .service(web::resource("/groups/{slug}/").route(web::delete().to(admin_delete_group)))
                .service(web::resource("/users/{username}/").route(web::delete().to(admin_delete_user)))
                .service(web::resource("/posts/{id}/").route(web::delete().to(admin_delete_post))),
        )
        .route("/media/{key:.*}", web::get().to(media))
        .default_service(web::to(not_found));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub image_store: Arc<dyn ImageStore>,
    pub page_cache: PageCache,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, image_store: Arc<dyn ImageStore>, settings: Settings) -> Self {
        Self {
            repo,
            image_store,
            page_cache: PageCache::with_capacity(settings.page_cache_ttl, settings.page_cache_max_entries),
            settings: Arc::new(settings),
        }
    }
}

// ---------------- page views -----------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexView {
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupView {
    pub group: Group,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileView {
    pub author: Author,
    pub posts_count: u64,
    pub following: bool,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PostDetailView {
    pub post: Post,
    pub post_count: u64,
    pub comments: Vec<Comment>,
    pub form: CommentFormView,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PostFormPage {
    pub form: PostFormView,
    pub groups: Vec<GroupChoice>,
    pub is_edit: bool,
    pub post_id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AccountFormPage {
    pub username: String,
    pub next: Option<String>,
    #[schema(value_type = Object)]
    pub errors: FormErrors,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// ---------------- helpers --------------------------------------------

fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found().insert_header((LOCATION, location.as_ref())).finish()
}

fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

fn detail_url(post_id: Id) -> String {
    format!("/posts/{post_id}/")
}

/// Resolves the token to a live account; a token for a deleted user counts as anonymous.
async fn current_user(data: &AppState, auth: Option<Auth>) -> Result<Option<User>, ApiError> {
    let Some(auth) = auth else { return Ok(None) };
    match data.repo.get_user(auth.user_id()).await {
        Ok(user) => Ok(Some(user)),
        Err(RepoError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn paginate(repo: &dyn Repo, filter: PostFilter, page: Option<&str>) -> Result<Page<Post>, ApiError> {
    let count = repo.count_posts(filter).await?;
    let window = Paginator::default().window(count, page);
    let items = repo.list_posts(filter, window.offset, window.limit).await?;
    Ok(Page::new(window, count, items))
}

async fn group_choices(data: &AppState) -> Result<Vec<GroupChoice>, ApiError> {
    Ok(data.repo.list_groups().await?.iter().map(GroupChoice::from).collect())
}

/// Persists an uploaded image and returns its media key.
async fn store_image(data: &AppState, image: Option<&ValidImage>) -> Result<Option<String>, ApiError> {
    let Some(image) = image else { return Ok(None) };
    let key = image.key();
    match data.image_store.save(&key, &image.mime, &image.bytes).await {
        // content addressed: a duplicate is the same picture
        Ok(()) | Err(ImageStoreError::Duplicate) => Ok(Some(key)),
        Err(e) => {
            error!("image store save failed for {key}: {e}");
            Err(ApiError::Internal)
        }
    }
}

// ---------------- listings -------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    params(PageQuery),
    responses((status = 200, description = "All posts, newest first; cached for a short fixed window"))
)]
pub async fn index(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let key = req.uri().to_string();
    if let Some((body, content_type)) = data.page_cache.get(&key) {
        return Ok(HttpResponse::Ok()
            .content_type(content_type)
            .insert_header(("X-Cache", "HIT"))
            .body(body));
    }
    let page_obj = paginate(&*data.repo, PostFilter::All, query.page.as_deref()).await?;
    let body = serde_json::to_vec(&IndexView { page_obj }).map_err(|e| {
        error!("index serialisation failed: {e}");
        ApiError::Internal
    })?;
    let body = Bytes::from(body);
    data.page_cache.insert(key, body.clone(), "application/json");
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header(("X-Cache", "MISS"))
        .body(body))
}

#[utoipa::path(
    get,
    path = "/group/{slug}/",
    params(("slug" = String, Path, description = "Group slug"), PageQuery),
    responses(
        (status = 200, description = "Posts in the group, newest first"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn group_posts(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let group = data.repo.get_group_by_slug(&path).await?;
    let page_obj = paginate(&*data.repo, PostFilter::Group(group.id), query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(GroupView { group, page_obj }))
}

#[utoipa::path(
    get,
    path = "/profile/{username}/",
    params(("username" = String, Path, description = "Author username"), PageQuery),
    responses(
        (status = 200, description = "Author's posts, post count and follow status"),
        (status = 404, description = "User not found")
    )
)]
pub async fn profile(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let author = data.repo.get_user_by_username(&path).await?;
    let filter = PostFilter::Author(author.id);
    let page_obj = paginate(&*data.repo, filter, query.page.as_deref()).await?;
    let following = match current_user(&data, auth).await? {
        Some(viewer) => data.repo.follow_exists(viewer.id, author.id).await?,
        None => false,
    };
    Ok(HttpResponse::Ok().json(ProfileView {
        author: Author::from(&author),
        posts_count: page_obj.count,
        following,
        page_obj,
    }))
}

#[utoipa::path(
    get,
    path = "/posts/{id}/",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with its comments", body = PostDetailView),
        (status = 404, description = "Post not found")
    )
)]
pub async fn post_detail(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    let post_count = data.repo.count_posts(PostFilter::Author(post.author_id)).await?;
    let comments = data.repo.list_comments(post.id).await?;
    Ok(HttpResponse::Ok().json(PostDetailView { post, post_count, comments, form: CommentFormView::default() }))
}

// ---------------- create / edit --------------------------------------

#[utoipa::path(
    get,
    path = "/create/",
    responses(
        (status = 200, description = "Empty post form", body = PostFormPage),
        (status = 302, description = "Not logged in; redirect to login")
    )
)]
pub async fn post_create_form(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if current_user(&data, auth).await?.is_none() {
        return Ok(auth::login_redirect(req.path()));
    }
    Ok(HttpResponse::Ok().json(PostFormPage {
        form: PostFormView::default(),
        groups: group_choices(&data).await?,
        is_edit: false,
        post_id: None,
    }))
}

#[utoipa::path(
    post,
    path = "/create/",
    responses(
        (status = 302, description = "Created; redirect to the author's profile"),
        (status = 400, description = "Form rejected", body = PostFormPage)
    )
)]
pub async fn post_create(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = current_user(&data, auth).await? else {
        return Ok(auth::login_redirect(req.path()));
    };
    let raw = RawPostForm::from_request(&req, payload).await?;
    match raw.validate(&*data.repo).await? {
        Ok(clean) => {
            let image = store_image(&data, clean.image.as_ref()).await?;
            let post = data
                .repo
                .create_post(NewPost { author_id: user.id, text: clean.text, group_id: clean.group_id, image })
                .await?;
            info!(post_id = post.id, author = %user.username, "post created");
            Ok(redirect(profile_url(&user.username)))
        }
        Err(errors) => {
            warn!(author = %user.username, ?errors, "post form rejected");
            Ok(HttpResponse::BadRequest().json(PostFormPage {
                form: raw.bound(errors),
                groups: group_choices(&data).await?,
                is_edit: false,
                post_id: None,
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post form bound to the post", body = PostFormPage),
        (status = 302, description = "Not the author (to detail) or not logged in (to login)"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn post_edit_form(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = current_user(&data, auth).await? else {
        return Ok(auth::login_redirect(req.path()));
    };
    let post = data.repo.get_post(path.into_inner()).await?;
    if post.author_id != user.id {
        return Ok(redirect(detail_url(post.id)));
    }
    Ok(HttpResponse::Ok().json(PostFormPage {
        form: PostFormView::for_post(&post),
        groups: group_choices(&data).await?,
        is_edit: true,
        post_id: Some(post.id),
    }))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 302, description = "Updated, or silently refused for non-authors; both land on the detail page"),
        (status = 400, description = "Form rejected", body = PostFormPage),
        (status = 404, description = "Post not found")
    )
)]
pub async fn post_edit(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = current_user(&data, auth).await? else {
        return Ok(auth::login_redirect(req.path()));
    };
    let post = data.repo.get_post(path.into_inner()).await?;
    if post.author_id != user.id {
        info!(post_id = post.id, user = %user.username, "edit by non-author ignored");
        return Ok(redirect(detail_url(post.id)));
    }
    let raw = RawPostForm::from_request(&req, payload).await?;
    match raw.validate(&*data.repo).await? {
        Ok(clean) => {
            let image = store_image(&data, clean.image.as_ref()).await?;
            let post = data
                .repo
                .update_post(post.id, PostUpdate { text: clean.text, group_id: clean.group_id, image })
                .await?;
            info!(post_id = post.id, "post updated");
            Ok(redirect(detail_url(post.id)))
        }
        Err(errors) => {
            warn!(post_id = post.id, ?errors, "post edit rejected");
            let mut form = raw.bound(errors);
            form.image = post.image.clone();
            Ok(HttpResponse::BadRequest().json(PostFormPage {
                form,
                groups: group_choices(&data).await?,
                is_edit: true,
                post_id: Some(post.id),
            }))
        }
    }
}

// ---------------- comments -------------------------------------------

#[utoipa::path(
    post,
    path = "/posts/{id}/comment/",
    params(("id" = i64, Path, description = "Post id")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Always back to the post; the comment is stored only for a logged-in user with valid text"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn add_comment(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    form: Option<web::Form<CommentForm>>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    let location = detail_url(post.id);
    let Some(user) = current_user(&data, auth).await? else {
        return Ok(redirect(location));
    };
    match form.map(web::Form::into_inner).unwrap_or_default().clean() {
        Ok(text) => {
            let comment = data
                .repo
                .create_comment(NewComment { post_id: post.id, author_id: user.id, text })
                .await?;
            info!(comment_id = comment.id, post_id = post.id, "comment added");
        }
        Err(errors) => warn!(post_id = post.id, ?errors, "comment rejected"),
    }
    Ok(redirect(location))
}

// ---------------- follows --------------------------------------------

#[utoipa::path(
    get,
    path = "/follow/",
    params(PageQuery),
    responses(
        (status = 200, description = "Posts by followed authors, newest first"),
        (status = 302, description = "Not logged in; redirect to login")
    )
)]
pub async fn follow_index(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = current_user(&data, auth).await? else {
        return Ok(auth::login_redirect(req.path()));
    };
    let page_obj = paginate(&*data.repo, PostFilter::FollowedBy(user.id), query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(IndexView { page_obj }))
}

#[utoipa::path(
    get,
    path = "/profile/{username}/follow/",
    params(("username" = String, Path, description = "Author to follow")),
    responses(
        (status = 302, description = "Redirect to the feed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn profile_follow(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = current_user(&data, auth).await? else {
        return Ok(auth::login_redirect(req.path()));
    };
    let author = data.repo.get_user_by_username(&path).await?;
    if user.id != author.id && !data.repo.follow_exists(user.id, author.id).await? {
        data.repo.create_follow(user.id, author.id).await?;
        info!(follower = %user.username, author = %author.username, "follow created");
    }
    Ok(redirect(FEED_URL))
}

#[utoipa::path(
    get,
    path = "/profile/{username}/unfollow/",
    params(("username" = String, Path, description = "Author to unfollow")),
    responses(
        (status = 302, description = "Redirect to the feed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn profile_unfollow(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = current_user(&data, auth).await? else {
        return Ok(auth::login_redirect(req.path()));
    };
    let author = data.repo.get_user_by_username(&path).await?;
    let removed = data.repo.delete_follows(user.id, author.id).await?;
    if removed > 0 {
        info!(follower = %user.username, author = %author.username, removed, "follow removed");
    }
    Ok(redirect(FEED_URL))
}

// ---------------- accounts -------------------------------------------

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

pub async fn login_page(query: web::Query<NextQuery>) -> HttpResponse {
    HttpResponse::Ok().json(AccountFormPage {
        username: String::new(),
        next: query.into_inner().next,
        errors: FormErrors::new(),
    })
}

#[utoipa::path(
    post,
    path = "/auth/login/",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Session cookie set; redirect to `next` or /"),
        (status = 400, description = "Bad credentials", body = AccountFormPage)
    )
)]
pub async fn login(data: web::Data<AppState>, form: web::Form<LoginForm>) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    let username = form.username.trim();
    let user = match data.repo.get_user_by_username(username).await {
        Ok(user) if auth::verify_password(&form.password, &user.password_hash) => user,
        Ok(_) | Err(RepoError::NotFound) => {
            warn!(username, "login failed");
            let mut errors = FormErrors::new();
            errors.insert(NON_FIELD.into(), vec![BAD_CREDENTIALS.into()]);
            return Ok(HttpResponse::BadRequest().json(AccountFormPage {
                username: username.to_string(),
                next: form.next,
                errors,
            }));
        }
        Err(e) => return Err(e.into()),
    };
    let token = auth::token_for(&user).map_err(|e| {
        error!("token issue failed: {e}");
        ApiError::Internal
    })?;
    info!(username = %user.username, "logged in");
    Ok(HttpResponse::Found()
        .cookie(auth::session_cookie(&token))
        .insert_header((LOCATION, auth::safe_next(form.next.as_deref())))
        .finish())
}

#[utoipa::path(
    post,
    path = "/auth/signup/",
    request_body(content = SignupForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Account created and logged in"),
        (status = 400, description = "Form rejected", body = AccountFormPage)
    )
)]
pub async fn signup(data: web::Data<AppState>, form: web::Form<SignupForm>) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    let rejected = |errors: FormErrors| {
        HttpResponse::BadRequest().json(AccountFormPage { username: form.username.clone(), next: None, errors })
    };
    let username = match form.validate() {
        Ok(username) => username,
        Err(errors) => return Ok(rejected(errors)),
    };
    let password_hash = auth::hash_password(&form.password).map_err(|e| {
        error!("password hashing failed: {e}");
        ApiError::Internal
    })?;
    let is_admin = data.settings.is_bootstrap_admin(&username);
    let user = match data.repo.create_user(NewUser { username, password_hash, is_admin }).await {
        Ok(user) => user,
        Err(RepoError::Conflict) => {
            let mut errors = FormErrors::new();
            errors.insert("username".into(), vec![USERNAME_TAKEN.into()]);
            return Ok(rejected(errors));
        }
        Err(e) => return Err(e.into()),
    };
    let token = auth::token_for(&user).map_err(|e| {
        error!("token issue failed: {e}");
        ApiError::Internal
    })?;
    info!(username = %user.username, is_admin, "account created");
    Ok(HttpResponse::Found()
        .cookie(auth::session_cookie(&token))
        .insert_header((LOCATION, "/"))
        .finish())
}

pub async fn logout() -> HttpResponse {
    HttpResponse::Found()
        .cookie(auth::expired_session_cookie())
        .insert_header((LOCATION, "/"))
        .finish()
}

// ---------------- administration -------------------------------------

#[utoipa::path(
    post,
    path = "/admin/groups/",
    request_body = NewGroup,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 400, description = "Invalid title or slug"),
        (status = 403, description = "Forbidden - admins only"),
        (status = 409, description = "Slug already taken")
    )
)]
pub async fn admin_create_group(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewGroup>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let new = match validate_group(payload.into_inner()) {
        Ok(new) => new,
        Err(errors) => return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "errors": errors }))),
    };
    let group = data.repo.create_group(new).await?;
    info!(slug = %group.slug, "group created");
    Ok(HttpResponse::Created().json(group))
}

#[utoipa::path(
    delete,
    path = "/admin/groups/{slug}/",
    params(("slug" = String, Path, description = "Group slug")),
    responses(
        (status = 204, description = "Group deleted; its posts are kept without a group"),
        (status = 403, description = "Forbidden - admins only"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn admin_delete_group(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let group = data.repo.get_group_by_slug(&path).await?;
    data.repo.delete_group(group.id).await?;
    info!(slug = %group.slug, "group deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    delete,
    path = "/admin/users/{username}/",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "User deleted with their posts, comments and follows"),
        (status = 403, description = "Forbidden - admins only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn admin_delete_user(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let user = data.repo.get_user_by_username(&path).await?;
    data.repo.delete_user(user.id).await?;
    info!(username = %user.username, "user deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    delete,
    path = "/admin/posts/{id}/",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted with its comments"),
        (status = 403, description = "Forbidden - admins only"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn admin_delete_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let id = path.into_inner();
    data.repo.delete_post(id).await?;
    info!(post_id = id, "post deleted");
    Ok(HttpResponse::NoContent().finish())
}

// ---------------- media / fallback -----------------------------------

pub async fn media(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    match data.image_store.load(&path).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok().content_type(mime).body(bytes)),
        Err(ImageStoreError::NotFound) | Err(ImageStoreError::InvalidKey) => Err(ApiError::NotFound),
        Err(e) => {
            error!("image store load failed: {e}");
            Err(ApiError::Internal)
        }
    }
}

pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}
