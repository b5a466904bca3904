use crate::forms::{CommentForm, CommentFormView, GroupChoice, LoginForm, PostFormView, SignupForm};
use crate::models::{Author, Comment, Group, NewGroup, Post};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::index,
        crate::routes::group_posts,
        crate::routes::profile,
        crate::routes::post_detail,
        crate::routes::post_create_form,
        crate::routes::post_create,
        crate::routes::post_edit_form,
        crate::routes::post_edit,
        crate::routes::add_comment,
        crate::routes::follow_index,
        crate::routes::profile_follow,
        crate::routes::profile_unfollow,
        crate::routes::login,
        crate::routes::signup,
        crate::routes::admin_create_group,
        crate::routes::admin_delete_group,
        crate::routes::admin_delete_user,
        crate::routes::admin_delete_post,
    ),
    components(schemas(
        Group, NewGroup, Post, Comment, Author,
        PostFormView, CommentForm, CommentFormView, GroupChoice, LoginForm, SignupForm,
        crate::routes::PostDetailView, crate::routes::PostFormPage, crate::routes::AccountFormPage
    )),
    tags(
        (name = "posts", description = "Listings, post pages and authoring"),
        (name = "follows", description = "Author subscriptions and the personal feed"),
        (name = "admin", description = "Administrative group, user and post management"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_public_page() {
        let doc = ApiDoc::openapi();
        for path in ["/", "/group/{slug}/", "/posts/{id}/edit/", "/follow/", "/admin/groups/"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
