use rackops_common::{NewZone, ResourceStatus};
use rackops_providers::mock::{MockCloud, SQUEEZE_IMAGE_ID};
use rackops_providers::{list_all_zones, ComputeProvider, DnsProvider, ObjectStore};

async fn status(cloud: &MockCloud, id: &str) -> ResourceStatus {
    cloud.get_server(id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn server_settles_after_configured_polls() {
    let cloud = MockCloud::new().with_build_polls(2);
    let s = cloud
        .create_server("web01", SQUEEZE_IMAGE_ID, "2", &[])
        .await
        .unwrap();
    assert_eq!(s.status, ResourceStatus::Build);
    assert!(s.admin_pass.is_some());

    assert_eq!(status(&cloud, &s.id).await, ResourceStatus::Build);
    assert_eq!(status(&cloud, &s.id).await, ResourceStatus::Build);
    assert_eq!(status(&cloud, &s.id).await, ResourceStatus::Active);
    assert_eq!(status(&cloud, &s.id).await, ResourceStatus::Active);
}

#[tokio::test]
async fn injected_build_failure_settles_as_error() {
    let cloud = MockCloud::new().with_build_polls(0).fail_build("bad01");
    let s = cloud
        .create_server("bad01", SQUEEZE_IMAGE_ID, "2", &[])
        .await
        .unwrap();
    let polled = cloud.get_server(&s.id).await.unwrap().unwrap();
    assert_eq!(polled.status, ResourceStatus::Error);
}

#[tokio::test]
async fn unknown_image_is_rejected() {
    let cloud = MockCloud::new();
    assert!(cloud.create_server("x", "nope", "2", &[]).await.is_err());
}

#[tokio::test]
async fn zones_page_and_create() {
    let cloud = MockCloud::new().with_zone("a.com").with_zone("b.com");
    cloud
        .create_zone(&NewZone {
            name: "c.com".to_string(),
            email: "h@c.com".to_string(),
            ttl: 300,
            comment: None,
        })
        .await
        .unwrap();
    let first = cloud.list_zones(2, 0).await.unwrap();
    assert_eq!(first.zones.len(), 2);
    assert!(first.has_next);
    assert_eq!(list_all_zones(&cloud, 2).await.unwrap().len(), 3);
}

#[tokio::test]
async fn failing_operation_errors() {
    let cloud = MockCloud::new()
        .with_container("site", None)
        .fail_operation("put_object");
    let err = cloud
        .put_object("site", "index.html", b"hi".to_vec(), "text/html")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("put_object"));
    assert!(cloud.objects("site").is_empty());
}

#[tokio::test]
async fn cdn_enable_is_visible_on_container() {
    let cloud = MockCloud::new().with_container("site", None);
    let c = cloud.enable_cdn("site", 1200).await.unwrap();
    let cdn = c.cdn.unwrap();
    assert_eq!(cdn.ttl, 1200);
    assert!(cdn.uri.starts_with("http://"));
    assert!(cdn.host().ends_with(".rackcdn.com"));
}
