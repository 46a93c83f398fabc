//! Company and wms contexts driven directly: initial fetch, channel
//! binding, event-to-refetch mapping and failure isolation.

mod common;

use std::sync::Arc;

use common::{connected_realtime, control, realtime_with_token, FakeApi};
use wmsync_console::entity::{
    CompanyEvent, CompanyScope, CompanySlice, MyCompanyContext, MyWmsContext, ScopedEvent,
    WmsEvent, WmsScope, WmsSlice,
};
use wmsync_sdk::realtime::InboundEvent;
use wmsync_sdk::types::{ChannelName, Identity};

fn company_context(api: &Arc<FakeApi>, realtime: wmsync_console::RealtimeContext) -> MyCompanyContext {
    MyCompanyContext::new(CompanyScope::new(api.clone(), true), realtime)
}

fn wms_context(api: &Arc<FakeApi>, realtime: wmsync_console::RealtimeContext) -> MyWmsContext {
    MyWmsContext::new(WmsScope::new(api.clone(), true), realtime)
}

fn company_call(slice: CompanySlice) -> &'static str {
    match slice {
        CompanySlice::Company => "fetch_company",
        CompanySlice::Warehouses => "fetch_company_warehouses",
        CompanySlice::Users => "fetch_company_users",
    }
}

fn wms_call(slice: WmsSlice) -> &'static str {
    match slice {
        WmsSlice::Wms => "fetch_wms",
        WmsSlice::Roles => "fetch_wms_roles",
        WmsSlice::Users => "fetch_wms_users",
        WmsSlice::Permissions => "fetch_wms_permissions",
        WmsSlice::Invitations => "fetch_wms_invitations",
    }
}

#[tokio::test]
async fn test_identity_appears_loads_every_slice_and_subscribes_once() {
    let api = FakeApi::new();
    let (realtime, _listener, mut peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);

    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;

    let scope = ctx.scope();
    assert!(scope.company().value().is_some());
    assert!(scope.warehouses().value().is_some());
    assert!(scope.users().value().is_some());
    assert!(!scope.company().is_loading());
    assert!(!scope.users().is_loading());
    assert!(!scope.warehouses().is_loading());
    assert_eq!(scope.company().error(), None);
    assert_eq!(api.count("fetch_company"), 1);
    assert_eq!(api.count("fetch_company_warehouses"), 1);
    assert_eq!(api.count("fetch_company_users"), 1);
    assert_eq!(peer.drain_outbound(), vec![control("subscribe", "company:c1")]);
    assert_eq!(ctx.bound_channel().await, Some(ChannelName::company("c1")));
}

#[tokio::test]
async fn test_same_identity_does_not_refetch_or_resubscribe() {
    let api = FakeApi::new();
    let (realtime, _listener, mut peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    let identity = Identity::company("u1", "c1");

    ctx.set_identity(Some(&identity)).await;
    ctx.set_identity(Some(&identity)).await;
    ctx.set_identity(Some(&identity.clone().with_role("r9"))).await;

    assert_eq!(api.calls().len(), 3);
    assert_eq!(peer.drain_outbound(), vec![control("subscribe", "company:c1")]);
}

#[tokio::test]
async fn test_user_joined_refetches_only_users() {
    let api = FakeApi::new();
    let (realtime, _listener, _peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;
    let company = ctx.scope().company().value();
    let warehouses = ctx.scope().warehouses().value();
    let users = ctx.scope().users().value();

    let refetched = ctx
        .handle_event(&InboundEvent::new("UserJoined", "company:c1"))
        .await;

    assert_eq!(refetched, &[CompanySlice::Users]);
    assert_eq!(api.count("fetch_company_users"), 2);
    assert_eq!(api.count("fetch_company"), 1);
    assert_eq!(api.count("fetch_company_warehouses"), 1);
    assert_ne!(ctx.scope().users().value(), users);
    assert_eq!(ctx.scope().company().value(), company);
    assert_eq!(ctx.scope().warehouses().value(), warehouses);
}

#[tokio::test]
async fn test_event_on_other_channel_is_ignored() {
    let api = FakeApi::new();
    let (realtime, _listener, _peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;
    api.clear_calls();

    for channel in ["company:c2", "wms:c1", "user:c1"] {
        let refetched = ctx
            .handle_event(&InboundEvent::new("UserJoined", channel))
            .await;
        assert!(refetched.is_empty());
    }
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_unmapped_event_is_ignored() {
    let api = FakeApi::new();
    let (realtime, _listener, _peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;
    api.clear_calls();

    let refetched = ctx
        .handle_event(&InboundEvent::new("RoleCreated", "company:c1"))
        .await;

    assert!(refetched.is_empty());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_every_company_event_refetches_exactly_its_slices() {
    let api = FakeApi::new();
    let (realtime, _listener, _peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;

    for event in CompanyEvent::ALL {
        api.clear_calls();
        ctx.handle_event(&InboundEvent::new(event.name(), "company:c1"))
            .await;

        let mut expected: Vec<String> = event
            .refetches()
            .iter()
            .map(|slice| format!("{}:c1", company_call(*slice)))
            .collect();
        let mut calls = api.calls();
        expected.sort();
        calls.sort();
        assert_eq!(calls, expected, "{:?}", event);
    }
}

#[tokio::test]
async fn test_every_wms_event_refetches_exactly_its_slices() {
    let api = FakeApi::new();
    let (realtime, _listener, _peer) = connected_realtime().await;
    let ctx = wms_context(&api, realtime);
    ctx.set_identity(Some(&Identity::wms("u1", "w1"))).await;

    for event in WmsEvent::ALL {
        api.clear_calls();
        ctx.handle_event(&InboundEvent::new(event.name(), "wms:w1"))
            .await;

        let mut expected: Vec<String> = event
            .refetches()
            .iter()
            .map(|slice| format!("{}:w1", wms_call(*slice)))
            .collect();
        let mut calls = api.calls();
        expected.sort();
        calls.sort();
        assert_eq!(calls, expected, "{:?}", event);
    }
}

#[tokio::test]
async fn test_identity_loss_clears_slices_and_unsubscribes() {
    let api = FakeApi::new();
    let (realtime, _listener, mut peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;

    ctx.set_identity(None).await;

    assert_eq!(ctx.scope().company().value(), None);
    assert_eq!(ctx.scope().warehouses().value(), None);
    assert_eq!(ctx.scope().users().value(), None);
    assert_eq!(ctx.scope().users().error(), None);
    assert_eq!(
        peer.drain_outbound(),
        vec![
            control("subscribe", "company:c1"),
            control("unsubscribe", "company:c1"),
        ]
    );

    api.clear_calls();
    ctx.handle_event(&InboundEvent::new("UserJoined", "company:c1"))
        .await;
    assert!(api.calls().is_empty());
    assert_eq!(ctx.scope().users().value(), None);
}

#[tokio::test]
async fn test_identity_without_company_id_stays_unloaded() {
    let api = FakeApi::new();
    let (realtime, _listener, mut peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    let mut identity = Identity::company("u1", "c1");
    identity.company_id = None;

    ctx.set_identity(Some(&identity)).await;

    assert!(api.calls().is_empty());
    assert!(peer.drain_outbound().is_empty());
    assert_eq!(ctx.scope().company().get().error, None);
}

#[tokio::test]
async fn test_fetch_failure_is_isolated() {
    let api = FakeApi::new();
    api.fail("fetch_company_users");
    let (realtime, _listener, _peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);

    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;

    let users = ctx.scope().users().get();
    assert_eq!(users.value, None);
    assert!(!users.loading);
    assert_eq!(
        users.error,
        Some("fetch_company_users is unavailable".to_string())
    );
    let company = ctx.scope().company().get();
    assert!(company.value.is_some());
    assert_eq!(company.error, None);
    assert!(!company.loading);
    assert!(ctx.scope().warehouses().value().is_some());

    api.succeed("fetch_company_users");
    ctx.handle_event(&InboundEvent::new("UserLeft", "company:c1"))
        .await;
    assert!(ctx.scope().users().value().is_some());
    assert_eq!(ctx.scope().users().error(), None);
}

#[tokio::test]
async fn test_identity_change_moves_channel_and_refetches() {
    let api = FakeApi::new();
    let (realtime, _listener, mut peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;
    api.clear_calls();

    ctx.set_identity(Some(&Identity::company("u1", "c2"))).await;

    assert_eq!(
        peer.drain_outbound(),
        vec![
            control("subscribe", "company:c1"),
            control("unsubscribe", "company:c1"),
            control("subscribe", "company:c2"),
        ]
    );
    let mut calls = api.calls();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            "fetch_company:c2".to_string(),
            "fetch_company_users:c2".to_string(),
            "fetch_company_warehouses:c2".to_string(),
        ]
    );
    assert_eq!(
        ctx.scope().company().value().map(|c| c.id),
        Some("c2".to_string())
    );
    assert_eq!(ctx.channel(), Some(ChannelName::company("c2")));
}

#[tokio::test]
async fn test_result_for_previous_company_is_discarded() {
    let api = FakeApi::new();
    api.hold("fetch_company:c1");
    let (realtime, _listener, _peer) = connected_realtime().await;
    let ctx = Arc::new(company_context(&api, realtime));

    let first = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;
        })
    };
    common::eventually("c1 company fetch", || {
        api.calls().contains(&"fetch_company:c1".to_string())
    })
    .await;

    ctx.set_identity(Some(&Identity::company("u1", "c2"))).await;
    api.release("fetch_company:c1");
    first.await.expect("join");

    assert_eq!(
        ctx.scope().company().value().map(|c| c.id),
        Some("c2".to_string())
    );
    assert!(!ctx.scope().company().is_loading());
}

#[tokio::test]
async fn test_subscribes_once_connected() {
    let api = FakeApi::new();
    let (realtime, mut listener) = realtime_with_token(Some("secret"));
    let ctx = company_context(&api, realtime.clone());

    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;
    assert!(ctx.scope().company().value().is_some());
    assert_eq!(ctx.bound_channel().await, None);

    realtime.mount();
    let mut peer = listener.accept().await.expect("peer");
    let mut state = realtime.watch_state();
    let _ = state.wait_for(|s| s.is_connected()).await;
    ctx.on_connection(true).await;
    ctx.on_connection(true).await;

    assert_eq!(peer.drain_outbound(), vec![control("subscribe", "company:c1")]);
}

#[tokio::test]
async fn test_unmount_releases_channel_and_ignores_identity() {
    let api = FakeApi::new();
    let (realtime, _listener, mut peer) = connected_realtime().await;
    let ctx = company_context(&api, realtime);
    ctx.set_identity(Some(&Identity::company("u1", "c1"))).await;

    ctx.unmount().await;
    ctx.set_identity(Some(&Identity::company("u1", "c2"))).await;

    assert!(!ctx.is_mounted());
    assert_eq!(ctx.scope().company().value(), None);
    assert_eq!(
        peer.drain_outbound(),
        vec![
            control("subscribe", "company:c1"),
            control("unsubscribe", "company:c1"),
        ]
    );
    assert_eq!(api.count("fetch_company"), 1);
}

#[tokio::test]
async fn test_wms_context_loads_and_maps_role_reassigned() {
    let api = FakeApi::new();
    let (realtime, _listener, mut peer) = connected_realtime().await;
    let ctx = wms_context(&api, realtime);

    ctx.set_identity(Some(&Identity::wms("u1", "w1"))).await;

    let scope = ctx.scope();
    assert!(scope.wms().value().is_some());
    assert!(scope.roles().value().is_some());
    assert!(scope.users().value().is_some());
    assert!(scope.permissions().value().is_some());
    assert_eq!(scope.pending_invitations().len(), 1);
    assert_eq!(peer.drain_outbound(), vec![control("subscribe", "wms:w1")]);

    let refetched = ctx
        .handle_event(&InboundEvent::new("RoleReassigned", "wms:w1"))
        .await;
    assert_eq!(refetched, &[WmsSlice::Roles, WmsSlice::Users]);
    assert_eq!(api.count("fetch_wms_roles"), 2);
    assert_eq!(api.count("fetch_wms_users"), 2);
    assert_eq!(api.count("fetch_wms"), 1);
    assert_eq!(api.count("fetch_wms_permissions"), 1);
    assert_eq!(api.count("fetch_wms_invitations"), 1);
}
