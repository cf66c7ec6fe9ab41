use rand::seq::SliceRandom;

use crate::db::models::{NewComment, NewPost, NewUser, User};
use crate::db::{comments, posts, users};
use crate::error::AppResult;
use crate::state::DbPool;

const SEED_USERS: &[(&str, &str)] = &[
    ("Akello Siduwa", "akellosiduwa@gmail.com"),
    ("Mudiera Oyieri", "mudieraoyieri@gmail.com"),
    ("Okotch K'Oundo", "okotchkoundo@gmail.com"),
];

const COMMENTS_PER_POST: usize = 2;

/// Summary of what `run` inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
}

/// Wipe all content and insert demo users, one post each and two comments
/// per post from randomly picked users. Safe to run repeatedly.
pub fn run(pool: &DbPool) -> AppResult<SeedReport> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    tx.execute_batch(
        "DELETE FROM comments;
         DELETE FROM posts;
         DELETE FROM users;",
    )?;

    tracing::info!("Seeding users");
    let seeded: Vec<User> = SEED_USERS
        .iter()
        .map(|(name, email)| {
            users::create(
                &tx,
                &NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                },
            )
        })
        .collect::<AppResult<_>>()?;

    tracing::info!("Seeding posts");
    let mut post_ids = Vec::with_capacity(seeded.len());
    for user in &seeded {
        let post = posts::create(
            &tx,
            &NewPost {
                title: format!("{}'s first post", user.name),
                body: format!("This is the body of the post by {}.", user.name),
                user_id: Some(user.id),
            },
        )?;
        post_ids.push((post.id, first_name(&user.name).to_string()));
    }

    tracing::info!("Seeding comments");
    let mut rng = rand::thread_rng();
    let mut comment_count = 0;
    for (post_id, author_first_name) in &post_ids {
        for _ in 0..COMMENTS_PER_POST {
            let commenter = seeded.choose(&mut rng).map(|u| u.id);
            comments::create(
                &tx,
                *post_id,
                &NewComment {
                    body: format!("Nice post, {author_first_name}!"),
                    user_id: commenter,
                    post_id: None,
                },
            )?;
            comment_count += 1;
        }
    }

    tx.commit()?;
    tracing::info!("Seeding complete");

    Ok(SeedReport {
        users: seeded.len(),
        posts: post_ids.len(),
        comments: comment_count,
    })
}

fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}
