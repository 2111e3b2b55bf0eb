use gangway_core::prost_reflect::DescriptorPool;
use gangway_core::reflection::client::ReflectionClient;
use registry_service::RegistryService;
use tonic::service::Routes;

fn client() -> ReflectionClient<Routes> {
    let reflection = tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(registry_service::file_descriptor_set())
        .build_v1()
        .unwrap();
    let routes = Routes::new(reflection).add_service(RegistryService::new());
    ReflectionClient::new(routes)
}

#[tokio::test]
async fn lists_the_advertised_services() {
    let services = client().list_services().await.unwrap();

    assert!(services.contains(&"registry.Registry".to_string()));
    assert!(services.contains(&"grpc.reflection.v1.ServerReflection".to_string()));
}

#[tokio::test]
async fn fetches_a_usable_descriptor_set_for_a_symbol() {
    let fd_set = client()
        .file_descriptor_set_for_symbol(registry_service::SERVICE_NAME)
        .await
        .unwrap();

    assert!(
        fd_set
            .file
            .iter()
            .any(|file| file.name.as_deref() == Some("registry.proto"))
    );

    // The set must be closed enough to build a pool with the service in it.
    let pool = DescriptorPool::from_file_descriptor_set(fd_set).unwrap();
    let service = pool
        .get_service_by_name(registry_service::SERVICE_NAME)
        .unwrap();
    assert!(service.methods().any(|m| m.name() == "Get"));
}

#[tokio::test]
async fn an_unknown_symbol_is_reported_as_not_found() {
    let err = client()
        .file_descriptor_set_for_symbol("registry.Ghost")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}
