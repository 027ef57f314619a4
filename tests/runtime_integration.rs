//! Live document tests: upgrades, variable propagation and hot updates

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use sloth::runtime::{FnBehavior, LiveDocument, NodeId};
use sloth::{Diagnostic, Diagnostics, Loader, MemoryLoader, Runtime, RuntimeError};

const ICON: &str =
    r#"<template id="x-icon" data-element="span"><i data-var-name="class">*</i></template>"#;

const CARD: &str = r#"<link rel="import" href="icon.html">
<style>h2 { margin: 0 }</style>
<template id="x-card" data-element="article" class="card"><h2 data-var-name="title"></h2><x-icon data-var-name></x-icon><slot></slot></template>"#;

const PAGE: &str = r#"<html><head><style>body { color: black }</style><link rel="import" href="card.html"></head><body><x-card data-var-name="Ada">text</x-card></body></html>"#;

fn project() -> Arc<MemoryLoader> {
    Arc::new(
        MemoryLoader::new()
            .with_file("/icon.html", ICON)
            .with_file("/card.html", CARD),
    )
}

async fn boot(page: &str, loader: Arc<MemoryLoader>) -> Runtime {
    let loader: Arc<dyn Loader> = loader;
    let mut runtime = Runtime::new(page, loader)
        .unwrap()
        .with_diagnostics(Diagnostics::silent());
    runtime.boot().await.unwrap();
    runtime
}

fn find(doc: &LiveDocument, tag: &str) -> NodeId {
    doc.deep_descendants(doc.root())
        .into_iter()
        .find(|id| doc.tag(*id) == Some(tag))
        .unwrap_or_else(|| panic!("no <{tag}> in document"))
}

#[tokio::test]
async fn test_boot_renders_nested_templates() {
    let runtime = boot(PAGE, project()).await;
    let doc = runtime.document();
    let card = find(doc, "x-card");
    let icon = find(doc, "x-icon");

    assert_eq!(
        doc.shadow_html(card).as_deref(),
        Some(r#"<h2 data-var-name="title" title="Ada"></h2><x-icon data-var-name="Ada"></x-icon><slot></slot>"#)
    );
    assert_eq!(
        doc.shadow_html(icon).as_deref(),
        Some(r#"<i data-var-name="class" class="Ada">*</i>"#)
    );
    assert_eq!(doc.attr(card, "class"), Some("card"));
    // light children stay on the host
    assert_eq!(doc.inner_html(card), "text");

    assert_eq!(
        runtime.adopted_styles(card),
        &[
            "body { color: black }".to_string(),
            "h2 { margin: 0 }".to_string(),
            ":host { display: block; }".to_string(),
        ]
    );
    assert_eq!(
        runtime.adopted_styles(icon).last().map(String::as_str),
        Some(":host { display: inline; }")
    );
    assert!(runtime.diagnostics().is_empty());
}

#[tokio::test]
async fn test_attribute_change_propagates_through_nested_templates() {
    let mut runtime = boot(PAGE, project()).await;
    let card = find(runtime.document(), "x-card");
    let icon = find(runtime.document(), "x-icon");
    let h2 = find(runtime.document(), "h2");

    runtime.set_attribute(card, "data-var-name", "Grace");

    let doc = runtime.document();
    assert_eq!(doc.attr(h2, "title"), Some("Grace"));
    assert_eq!(doc.attr(icon, "data-var-name"), Some("Grace"));
    assert_eq!(
        doc.shadow_html(icon).as_deref(),
        Some(r#"<i data-var-name="class" class="Grace">*</i>"#)
    );
    assert_eq!(runtime.state(icon).unwrap().vars.get("name"), Some("Grace"));
}

#[tokio::test]
async fn test_hot_update_keeps_node_identity() {
    let loader = project();
    let mut runtime = boot(PAGE, Arc::clone(&loader)).await;
    let card = find(runtime.document(), "x-card");
    let icon = find(runtime.document(), "x-icon");
    let shadow = runtime.document().shadow_root(icon);
    runtime.set_attribute(card, "data-var-name", "Grace");

    loader.insert(
        "/icon.html",
        r#"<template id="x-icon" data-element="span"><b data-var-name="class">!</b></template>"#,
    );
    assert!(runtime.notify("/home/dev/site/icon.html"));
    assert_eq!(runtime.process_updates().await.unwrap(), 1);

    let doc = runtime.document();
    assert_eq!(find(doc, "x-icon"), icon);
    assert_eq!(doc.shadow_root(icon), shadow);
    assert_eq!(
        doc.shadow_html(icon).as_deref(),
        Some(r#"<b data-var-name="class" class="Grace">!</b>"#)
    );
    assert_eq!(
        runtime.definition("x-icon").unwrap().template.content.len(),
        1
    );
}

#[tokio::test]
async fn test_hot_update_of_importer_rerenders_host_in_place() {
    let loader = project();
    let mut runtime = boot(PAGE, Arc::clone(&loader)).await;
    let card = find(runtime.document(), "x-card");

    loader.insert(
        "/card.html",
        r#"<link rel="import" href="icon.html"><template id="x-card" data-element="section"><h3 data-var-name="title"></h3><x-icon data-var-name></x-icon></template>"#,
    );
    let updated = runtime.hot_update("/card.html").await.unwrap();
    assert_eq!(updated.as_deref(), Some("x-card"));

    let doc = runtime.document();
    assert_eq!(find(doc, "x-card"), card);
    assert_eq!(
        doc.shadow_html(card).as_deref(),
        Some(r#"<h3 data-var-name="title" title="Ada"></h3><x-icon data-var-name="Ada"></x-icon>"#)
    );
    let icon = find(doc, "x-icon");
    assert_eq!(
        doc.shadow_html(icon).as_deref(),
        Some(r#"<i data-var-name="class" class="Ada">*</i>"#)
    );
    assert_eq!(
        runtime.adopted_styles(card).last().map(String::as_str),
        Some(":host { display: block; }")
    );
}

#[tokio::test]
async fn test_unknown_file_is_ignored() {
    let mut runtime = boot(PAGE, project()).await;
    assert_eq!(runtime.hot_update("/styles/site.css").await.unwrap(), None);
}

#[tokio::test]
async fn test_updates_wait_for_boot_and_coalesce() {
    let loader: Arc<dyn Loader> = project();
    let mut runtime = Runtime::new(PAGE, loader)
        .unwrap()
        .with_diagnostics(Diagnostics::silent());

    assert!(runtime.notify("/icon.html"));
    assert!(!runtime.notify("/icon.html"));
    assert!(runtime
        .handle_message(r#"{"type":"custom","event":"template-update","data":{"path":"/card.html"}}"#)
        .unwrap());
    assert!(!runtime.handle_message(r#"{"type":"connected"}"#).unwrap());

    assert_eq!(runtime.process_updates().await.unwrap(), 0);
    assert_eq!(runtime.pending_updates(), 2);

    runtime.boot().await.unwrap();
    assert_eq!(runtime.process_updates().await.unwrap(), 2);
    assert_eq!(runtime.pending_updates(), 0);

    assert!(matches!(
        runtime.handle_message("not json"),
        Err(RuntimeError::Message(_))
    ));
}

#[tokio::test]
async fn test_behaviors_run_on_attach_swap_and_detach() {
    let setups = Rc::new(Cell::new(0));
    let teardowns = Rc::new(Cell::new(0));

    let loader = project();
    let dyn_loader: Arc<dyn Loader> = loader.clone();
    let mut runtime = Runtime::new(PAGE, dyn_loader)
        .unwrap()
        .with_diagnostics(Diagnostics::silent());
    let (s, t) = (Rc::clone(&setups), Rc::clone(&teardowns));
    runtime.register_behavior(
        "x-card",
        FnBehavior::new(
            move |ctx| {
                s.set(s.get() + 1);
                ctx.document.set_attr(ctx.host, "data-ready", "yes");
            },
            move |_| t.set(t.get() + 1),
        ),
    );
    runtime.boot().await.unwrap();

    let card = find(runtime.document(), "x-card");
    assert_eq!((setups.get(), teardowns.get()), (1, 0));
    assert_eq!(runtime.document().attr(card, "data-ready"), Some("yes"));

    runtime.hot_update("/card.html").await.unwrap();
    assert_eq!((setups.get(), teardowns.get()), (2, 1));

    runtime.remove(card);
    assert_eq!((setups.get(), teardowns.get()), (2, 2));
    assert!(!runtime.state(card).unwrap().is_attached());

    let body = find(runtime.document(), "body");
    let shadow = runtime.document().shadow_root(card);
    runtime.append_child(body, card);
    assert_eq!((setups.get(), teardowns.get()), (3, 2));
    assert_eq!(runtime.document().shadow_root(card), shadow);
}

#[tokio::test]
async fn test_load_event_reapplies_styles() {
    let page = r#"<html><head></head><body><template id="x-box"><style>p { color: red }</style><p></p></template><x-box></x-box></body></html>"#;
    let mut runtime = boot(page, Arc::new(MemoryLoader::new())).await;
    let doc = runtime.document();
    let early = find(doc, "x-box");
    let head = find(doc, "head");
    let body = find(doc, "body");
    assert_eq!(runtime.adopted_styles(early).len(), 2);
    assert!(runtime.state(early).unwrap().load_listener);

    runtime
        .append_html(head, "<style>h1 { font-size: 2em }</style>")
        .unwrap();
    assert_eq!(runtime.adopted_styles(early).len(), 2);

    runtime.dispatch_load();
    assert_eq!(
        runtime.adopted_styles(early),
        &[
            "h1 { font-size: 2em }".to_string(),
            "p { color: red }".to_string(),
            ":host { display: block; }".to_string(),
        ]
    );

    let late = runtime.append_html(body, "<x-box></x-box>").unwrap()[0];
    assert!(runtime.state(late).unwrap().is_attached());
    assert!(!runtime.state(late).unwrap().load_listener);
}

#[tokio::test]
async fn test_polymorphic_element_keeps_its_tag() {
    let page = r#"<template id="x-note" class="note"><aside data-var-tone="class"><slot></slot></aside></template><section is="x-note" data-var-tone="warn">careful</section>"#;
    let runtime = boot(page, Arc::new(MemoryLoader::new())).await;
    let doc = runtime.document();
    let section = find(doc, "section");

    assert_eq!(
        doc.outer_html(section),
        r#"<section is="x-note" data-var-tone="warn" class="note">careful</section>"#
    );
    assert_eq!(
        doc.shadow_html(section).as_deref(),
        Some(r#"<aside data-var-tone="class" class="warn"><slot></slot></aside>"#)
    );
    assert!(runtime
        .adopted_styles(section)
        .iter()
        .all(|sheet| !sheet.starts_with(":host")));
}

#[tokio::test]
async fn test_unresolved_polymorphic_element_is_left_alone() {
    let runtime = boot(r#"<div is="x-nope">x</div>"#, Arc::new(MemoryLoader::new())).await;
    let div = find(runtime.document(), "div");

    assert_eq!(runtime.document().shadow_root(div), None);
    assert_eq!(
        runtime.diagnostics().entries(),
        &[Diagnostic::UnresolvedPolymorphicTemplate {
            template: "x-nope".to_string()
        }]
    );
    assert!(runtime.diagnostics().has_errors());
}

#[tokio::test]
async fn test_script_without_behavior_is_reported() {
    let loader = Arc::new(MemoryLoader::new().with_file(
        "/clock.html",
        r#"<template id="x-clock"><time></time></template><script>tick()</script>"#,
    ));
    let runtime = boot(r#"<link rel="import" href="clock.html"><x-clock></x-clock>"#, loader).await;
    assert_eq!(
        runtime.diagnostics().entries(),
        &[Diagnostic::MissingBehavior {
            template: "x-clock".to_string()
        }]
    );
}
