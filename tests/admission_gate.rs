mod common;

use std::sync::Arc;

use solutions_portal::{
    binding,
    entity::user::Role,
    gate::{self, Admission, DenyReason},
    settings, users, Identity, MaintenanceSetting, PortalContext, SeaOrmStore,
};
use tower_sessions::Session;

use common::{context, seed_seat};

const DENY: Admission = Admission::Deny(DenyReason::Maintenance);

fn identity(id: &str) -> Identity {
    Identity {
        identity_id: id.to_string(),
        display_name: Some(id.to_uppercase()),
        email: None,
        photo_url: None,
    }
}

async fn student_on_seat(ctx: &PortalContext, id: &str, seat: i32) -> users::Principal {
    seed_seat(ctx, seat, id).await;
    binding::bind_seat(ctx, seat, &identity(id)).await.expect("bind");
    users::sign_in(ctx, &identity(id)).await.expect("sign in")
}

#[tokio::test]
async fn missing_setting_fails_open() {
    let (ctx, _) = context().await;
    let principal = users::sign_in(&ctx, &identity("alice")).await.expect("sign in");

    assert!(settings::load_maintenance(ctx.db()).await.unwrap().is_none());
    assert_eq!(gate::check(&ctx, &principal).await.unwrap(), Admission::Allow);
}

#[tokio::test]
async fn maintenance_blocks_students_except_testers() {
    let (ctx, _) = context().await;
    let tester = student_on_seat(&ctx, "tess", 3).await;
    let regular = student_on_seat(&ctx, "rob", 4).await;
    let unbound = users::sign_in(&ctx, &identity("nobody")).await.unwrap();
    settings::save_maintenance(ctx.db(), &MaintenanceSetting::new(true, [3]))
        .await
        .expect("enable");

    assert_eq!(gate::check(&ctx, &tester).await.unwrap(), Admission::Allow);
    assert_eq!(gate::check(&ctx, &regular).await.unwrap(), DENY);
    assert_eq!(gate::check(&ctx, &unbound).await.unwrap(), DENY);
}

#[tokio::test]
async fn teachers_pass_during_maintenance() {
    let (ctx, _) = context().await;
    users::sign_in(&ctx, &identity("tina")).await.unwrap();
    let teacher = users::set_role(&ctx, "tina", Role::Teacher).await.unwrap();
    settings::set_maintenance_active(ctx.db(), true).await.unwrap();

    assert_eq!(gate::check(&ctx, &teacher).await.unwrap(), Admission::Allow);
}

#[tokio::test]
async fn tester_list_edits_keep_switch_state() {
    let (ctx, _) = context().await;
    settings::set_maintenance_active(ctx.db(), true).await.unwrap();
    settings::add_tester(ctx.db(), 9).await.unwrap();
    settings::add_tester(ctx.db(), 2).await.unwrap();
    settings::add_tester(ctx.db(), 9).await.unwrap();
    settings::remove_tester(ctx.db(), 2).await.unwrap();

    let stored = settings::load_maintenance(ctx.db()).await.unwrap().unwrap();

    assert_eq!(stored, MaintenanceSetting::new(true, [9]));
}

#[tokio::test]
async fn admission_is_stored_in_the_session() {
    let (ctx, _) = context().await;
    let regular = student_on_seat(&ctx, "rob", 4).await;
    settings::set_maintenance_active(ctx.db(), true).await.unwrap();

    let store = Arc::new(SeaOrmStore::new(ctx.db().clone()));
    let session = Session::new(None, store.clone(), None);
    let decided = gate::admit_session(&ctx, &session, regular.clone())
        .await
        .expect("admit");
    session.save().await.expect("save session");

    // Switching maintenance off does not change an already started session.
    settings::set_maintenance_active(ctx.db(), false).await.unwrap();

    let reloaded = Session::new(session.id(), store, None);
    let (principal, admission) = gate::session_admission(&reloaded)
        .await
        .expect("read session")
        .expect("admitted session");

    assert_eq!(decided, DENY);
    assert_eq!(admission, DENY);
    assert_eq!(principal, regular);
}

#[tokio::test]
async fn first_sign_in_creates_student_without_seat() {
    let (ctx, _) = context().await;

    let principal = users::sign_in(&ctx, &identity("new")).await.expect("sign in");

    assert_eq!(principal.role, Role::Student);
    assert_eq!(principal.seat, None);
    assert_eq!(principal.display_name.as_deref(), Some("NEW"));
    assert_eq!(users::principal(&ctx, "new").await.unwrap(), principal);
}
