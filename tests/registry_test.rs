use std::sync::Arc;

use gate::config::{ConnectorEntry, ConnectorKind, Settings};
use gate::connectors::language::{Language, LanguageConnector};
use gate::connectors::native::NativeConnector;
use gate::connectors::process::MAX_OUTPUT_BYTES;
use gate::connectors::{ConnectionRequest, Connector};
use gate::events::EventBus;
use gate::gateway::{Gateway, GatewayConfig};
use gate::registry::{ConnectorRegistry, RegistryError};

#[test]
fn every_registered_name_resolves_to_its_instance() {
    let events = EventBus::default();
    let mut registry = ConnectorRegistry::new();
    let mut registered: Vec<(String, Arc<dyn Connector>)> = Vec::new();

    for language in Language::ALL {
        let connector: Arc<dyn Connector> =
            Arc::new(LanguageConnector::new(language, language.id(), events.clone()));
        registry
            .register(language.id(), Arc::clone(&connector))
            .unwrap();
        registered.push((language.id().to_string(), connector));
    }

    for (name, connector) in &registered {
        let resolved = registry.resolve(name).unwrap();
        assert!(Arc::ptr_eq(&resolved, connector), "{name} resolved to another instance");
    }
}

#[test]
fn duplicate_register_leaves_mapping_untouched() {
    let events = EventBus::default();
    let mut registry = ConnectorRegistry::new();
    let original: Arc<dyn Connector> = Arc::new(NativeConnector::new("main", events.clone()));
    registry.register("main", Arc::clone(&original)).unwrap();

    let result = registry.register(
        "main",
        Arc::new(LanguageConnector::new(Language::Go, "main", events)),
    );

    assert!(matches!(result, Err(RegistryError::DuplicateName(ref n)) if n == "main"));
    let resolved = registry.resolve("main").unwrap();
    assert!(Arc::ptr_eq(&resolved, &original));
    assert_eq!(resolved.kind(), "native");
}

#[tokio::test]
async fn default_settings_route_every_language() {
    let events = EventBus::default();
    let registry = Settings::default().build_registry(&events).unwrap();
    let gateway = Gateway::new(Arc::new(registry), events, GatewayConfig::default());

    for language in Language::ALL {
        let result = gateway
            .route(&ConnectionRequest::new("A", "B", language.id()))
            .await;
        assert!(result.is_connected(), "{} failed", language.id());
        assert_eq!(result.connector_name(), language.id());
    }
}

#[tokio::test]
async fn configured_process_connector_routes_through_gateway() {
    let settings = Settings {
        connectors: vec![ConnectorEntry {
            name: "script".to_string(),
            kind: ConnectorKind::Process {
                program: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    r#"printf '{"route": "%s=>%s"}' "$1" "$2""#.to_string(),
                    "gate".to_string(),
                ],
                working_dir: None,
                max_output_bytes: MAX_OUTPUT_BYTES,
            },
        }],
        ..Settings::default()
    };
    let events = EventBus::default();
    let registry = settings.build_registry(&events).unwrap();
    let gateway = Gateway::new(Arc::new(registry), events, settings.gateway_config());

    let result = gateway
        .route(&ConnectionRequest::new("left", "right", "script"))
        .await;

    assert!(result.is_connected());
    assert_eq!(result.connector_name(), "script");
    assert_eq!(result.detail().get("route").unwrap(), "left=>right");
    assert_eq!(result.detail().get("source_type").unwrap(), "process");
}
