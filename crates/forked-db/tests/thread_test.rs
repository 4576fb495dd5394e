//! End-to-end storage test for the seed-tree invariant: every post traces to
//! exactly one seed, roots self-reference, children inherit.

use forked_db::Database;
use forked_db::models::GithubProfile;
use uuid::Uuid;

fn open_temp() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("forked.db")).unwrap();
    (db, dir)
}

fn make_user(db: &Database, github_id: &str, username: &str) -> String {
    db.upsert_github_user(
        &Uuid::new_v4().to_string(),
        &GithubProfile {
            github_id,
            username,
            display_name: Some(username),
            avatar_url: None,
            profile_url: None,
            email: None,
        },
    )
    .unwrap()
    .id
}

fn make_post(
    db: &Database,
    author: &str,
    content: &str,
    parent: Option<&str>,
    kind: &str,
) -> String {
    let id = Uuid::new_v4().to_string();
    match parent {
        Some(parent_id) => {
            let parent_row = db.get_post(parent_id).unwrap().unwrap();
            let seed = parent_row.seed_id.unwrap_or(parent_row.id);
            db.insert_post(&id, content, author, Some(parent_id), Some(&seed), kind, None)
                .unwrap();
        }
        None => {
            db.insert_post(&id, content, author, None, None, "root", None)
                .unwrap();
            db.set_seed_to_self(&id).unwrap();
        }
    }
    id
}

#[test]
fn every_post_traces_to_one_seed() {
    let (db, _dir) = open_temp();
    let alice = make_user(&db, "gh-1", "alice");
    let bob = make_user(&db, "gh-2", "bob");

    let root = make_post(&db, &alice, "seed post", None, "root");
    let reply = make_post(&db, &bob, "a reply", Some(&root), "reply");
    let fork = make_post(&db, &bob, "a fork", Some(&root), "fork");
    let nested = make_post(&db, &alice, "deep reply", Some(&reply), "reply");

    for id in [&root, &reply, &fork, &nested] {
        let post = db.get_post(id).unwrap().unwrap();
        let expected = match &post.parent_id {
            None => post.id.clone(),
            Some(parent) => db.get_post(parent).unwrap().unwrap().seed_id.unwrap(),
        };
        assert_eq!(post.seed_id.as_deref(), Some(expected.as_str()));
        assert_eq!(post.seed_id.as_deref(), Some(root.as_str()));
    }
}

#[test]
fn thread_assembly_sees_parent_and_branches() {
    let (db, _dir) = open_temp();
    let alice = make_user(&db, "gh-1", "alice");
    let bob = make_user(&db, "gh-2", "bob");

    let root = make_post(&db, &alice, "seed post", None, "root");
    let reply = make_post(&db, &bob, "first", Some(&root), "reply");
    make_post(&db, &bob, "second", Some(&root), "fork");

    let branches = db.list_children(&root).unwrap();
    assert_eq!(branches.len(), 2);

    let reply_row = db.get_post(&reply).unwrap().unwrap();
    assert_eq!(reply_row.parent_id.as_deref(), Some(root.as_str()));
    assert_eq!(reply_row.author_username, "bob");
}

#[test]
fn deleting_a_post_cascades_its_likes_and_notifications() {
    let (db, _dir) = open_temp();
    let alice = make_user(&db, "gh-1", "alice");
    let bob = make_user(&db, "gh-2", "bob");

    let root = make_post(&db, &alice, "seed post", None, "root");
    db.insert_like(&Uuid::new_v4().to_string(), &bob, &root).unwrap();
    db.insert_notification(&Uuid::new_v4().to_string(), &alice, &bob, "like", Some(&root))
        .unwrap();

    assert!(db.delete_post(&root).unwrap());
    assert_eq!(db.count_likes(&root).unwrap(), 0);
    assert!(db.list_likes_by_user(&bob).unwrap().is_empty());
    assert_eq!(db.count_notifications(&alice).unwrap(), 0);
}
