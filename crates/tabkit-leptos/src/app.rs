//! Demo host: a profile feature with an async loader and a settings feature whose
//! sections are drawn by a prototype factory.

use std::sync::Arc;

use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabkit_core::schema::{FieldSchema, ObjectSchema};
use tabkit_core::{
    FeatureRegistry, FeatureScope, Tab, TabFactory, TabFactoryBuilder, TabFactoryOptions, TabFeature,
    TabPrototype, TabStore, TabsConfig,
};

use crate::layout::center::tabs::TabBar;
use crate::layout::global_context::TabsContext;
use crate::layout::tabs::{TabFactoryView, TabRouter};
use crate::shared::{DefaultError, TabView};

#[derive(Debug, Clone, PartialEq)]
pub struct DemoContext {
    pub api_base: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDeps {
    api_base: String,
    user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    user_id: String,
    name: String,
}

async fn fetch_profile(deps: ProfileDeps) -> anyhow::Result<Profile> {
    TimeoutFuture::new(400).await;
    if deps.user_id == "0" {
        anyhow::bail!("{}/users/{} returned 404", deps.api_base, deps.user_id);
    }
    Ok(Profile {
        name: format!("User #{}", deps.user_id),
        user_id: deps.user_id,
    })
}

fn profile_feature() -> TabFeature<DemoContext, TabView> {
    TabFeature::builder("profile", |scope: &FeatureScope<DemoContext>| {
        let profile = match scope.data_as::<Profile>() {
            Ok(profile) => profile,
            Err(err) => {
                return TabView::new(view! { <DefaultError title="Bad profile data" detail=err.to_string() /> })
            }
        };
        let scope = scope.clone();
        let open_settings = move |_| {
            let _ = scope.add_tab(Tab::with_id("settings", "settings", "Settings", json!({ "key": "general" })));
            scope.navigate(Some("settings"));
        };
        TabView::new(view! {
            <div class="profile">
                <h2>{profile.name}</h2>
                <p>"id: " {profile.user_id}</p>
                <button on:click=open_settings>"Settings"</button>
            </div>
        })
    })
    .schema(ObjectSchema::new().field(FieldSchema::string("userId").non_empty()))
    .loader_dependencies(|context: &DemoContext, tab: &Tab| ProfileDeps {
        api_base: context.api_base.clone(),
        user_id: tab.settings["userId"].as_str().unwrap_or_default().to_string(),
    })
    .loader(fetch_profile)
    .loading_component(|| TabView::new(view! { <div class="profile profile--loading">"Fetching profile…"</div> }))
    .on_close(|tab: &Tab, _: &DemoContext| log::info!("profile tab '{}' closed", tab.id))
    .build()
}

fn settings_factory() -> anyhow::Result<TabFactory<TabView>> {
    let general = TabPrototype::new(
        "general",
        ObjectSchema::new()
            .field(FieldSchema::literal("key", "general"))
            .field(FieldSchema::string("language").default_value("en")),
        |value: &serde_json::Value| {
            let language = value["language"].as_str().unwrap_or_default().to_string();
            TabView::new(view! { <div class="settings__general">"Language: " {language}</div> })
        },
    );
    let appearance = TabPrototype::new(
        "appearance",
        ObjectSchema::new()
            .field(FieldSchema::literal("key", "appearance"))
            .field(FieldSchema::one_of("theme", ["light", "dark"]).default_value("light")),
        |value: &serde_json::Value| {
            let theme = value["theme"].as_str().unwrap_or_default().to_string();
            TabView::new(view! { <div class="settings__appearance">"Theme: " {theme}</div> })
        },
    );

    let factory = TabFactoryBuilder::new()
        .add(general)?
        .add(appearance)?
        .build(TabFactoryOptions::default().error_component(|error: &str| {
            TabView::new(view! { <DefaultError title="Invalid settings section" detail=error.to_string() /> })
        }))?;
    Ok(factory)
}

fn settings_feature(factory: Arc<TabFactory<TabView>>) -> TabFeature<DemoContext, TabView> {
    TabFeature::builder("settings", move |scope: &FeatureScope<DemoContext>| {
        let section = scope.settings["key"].as_str().unwrap_or("general");
        let switch_to = if section == "general" { "appearance" } else { "general" };
        let data = Signal::stored(scope.settings.clone());

        let scope = scope.clone();
        let switch_section = move |_| {
            let _ = scope.update_self(|tab| {
                let mut tab = tab.mark_dirty(true);
                tab.settings = json!({ "key": switch_to });
                tab
            });
        };
        TabView::new(view! {
            <div class="settings">
                <button on:click=switch_section>{format!("Show {}", switch_to)}</button>
                <TabFactoryView factory=factory.clone() data=data />
            </div>
        })
    })
    .schema(
        ObjectSchema::new()
            .field(FieldSchema::one_of("key", ["general", "appearance"]).default_value("general"))
            .passthrough(),
    )
    .build()
}

fn build_registry() -> anyhow::Result<Arc<FeatureRegistry<DemoContext, TabView>>> {
    let factory = Arc::new(settings_factory()?);
    let registry = FeatureRegistry::register([profile_feature(), settings_feature(factory)])?;
    Ok(Arc::new(registry))
}

#[component]
pub fn App() -> impl IntoView {
    let config = TabsConfig::embedded().unwrap_or_else(|err| {
        log::error!("embedded tabs config is invalid: {:#}", err);
        TabsConfig::default()
    });
    let registry = match build_registry() {
        Ok(registry) => registry,
        Err(err) => {
            return view! { <DefaultError title="Tab setup failed" detail=format!("{:#}", err) /> }.into_any();
        }
    };

    let ctx = TabsContext::new(TabStore::with_policy(config.store.on_duplicate));
    provide_context(ctx);
    ctx.open_tab(Tab::with_id("profile-123", "profile", "Profile 123", json!({ "userId": "123" })));
    ctx.init_router_integration();

    let context = RwSignal::new(DemoContext {
        api_base: "/api".to_string(),
    });
    let active = Signal::derive(move || ctx.state.with(|state| state.active_id.clone()));
    let on_navigate = Callback::new(move |to: Option<String>| match to {
        Some(id) => ctx.activate_tab(&id),
        None => ctx.store().set_active(None),
    });

    let registry_for_close = registry.clone();
    let on_close = Callback::new(move |id: String| {
        if let Err(err) = registry_for_close.close_tab(&ctx.store(), &id, &context.get_untracked()) {
            log::warn!("close failed: {}", err);
        }
    });

    let next_user = RwSignal::new(124_u32);
    let open_profile = move |_| {
        let user = next_user.get_untracked();
        next_user.set(user + 1);
        ctx.open_tab(Tab::new("profile", format!("Profile {}", user), json!({ "userId": user.to_string() })));
    };
    let open_missing_user =
        move |_| ctx.open_tab(Tab::new("profile", "Missing user", json!({ "userId": "0" })));
    let open_invalid = move |_| ctx.open_tab(Tab::new("profile", "Invalid profile", json!({ "userId": "" })));
    let open_unknown = move |_| ctx.open_tab(Tab::new("chart", "Chart", json!({})));

    view! {
        <div class="app-layout">
            <div class="app-toolbar">
                <button on:click=open_profile>"New profile"</button>
                <button on:click=open_missing_user>"Missing user"</button>
                <button on:click=open_invalid>"Invalid settings"</button>
                <button on:click=open_unknown>"Unregistered feature"</button>
            </div>
            <TabBar on_close=on_close />
            <div class="app-main">
                <TabRouter
                    id=active
                    context=context
                    on_navigate=on_navigate
                    registry=registry
                    config=config
                    fallback_error=Callback::new(|detail: String| {
                        TabView::new(view! { <DefaultError title="Tab failed" detail=detail /> })
                    })
                />
            </div>
        </div>
    }
    .into_any()
}
