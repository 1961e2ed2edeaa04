//! Integration tests for MOVE destination validation
//!
//! Each test sets up a small tree under `cellA/boxA` and checks one rule of
//! destination resolution or validation.

mod common;

use cellbox::node::SERVICE_SOURCE_COLLECTION;
use cellbox::{DavError, MoveHeaders, NodeType, Status, TreeFacade};

use common::{dav, dav_url, master, put_text, setup_test_env, setup_test_env_with, CELL};

fn mkcol(facade: &TreeFacade, rel: &str, node_type: NodeType) {
    facade.mkcol(&master(), &dav(rel), node_type).unwrap();
}

fn mv(facade: &TreeFacade, from: &str, headers: MoveHeaders) -> cellbox::Result<cellbox::DavResponse> {
    facade.move_resource(&master(), &dav(from), &headers)
}

#[test]
fn test_destination_must_stay_in_the_box() {
    let (facade, _temp_dir) = setup_test_env();
    put_text(&facade, "f.txt", "x");

    for destination in [
        "https://elsewhere.example/cellA/boxA/g.txt".to_string(),
        "http://unit.example/cellA/boxA/g.txt".to_string(),
        format!("{}{CELL}/otherBox/g.txt", common::UNIT_URL),
        dav_url(""),
        "not a url".to_string(),
    ] {
        let result = mv(&facade, "f.txt", MoveHeaders::new(destination.clone()));
        assert!(
            matches!(result, Err(DavError::InvalidDestination(_))),
            "{destination}: {result:?}"
        );
    }
}

#[test]
fn test_destination_cannot_be_source_or_below_it() {
    let (facade, _temp_dir) = setup_test_env();
    mkcol(&facade, "col", NodeType::WebdavCollection);

    assert!(matches!(
        mv(&facade, "col", MoveHeaders::new(dav_url("col"))),
        Err(DavError::InvalidDestination(_))
    ));
    assert!(matches!(
        mv(&facade, "col", MoveHeaders::new(dav_url("col/inner"))),
        Err(DavError::InvalidDestination(_))
    ));
}

#[test]
fn test_headers_are_validated() {
    let (facade, _temp_dir) = setup_test_env();
    put_text(&facade, "f.txt", "x");

    assert!(matches!(
        mv(&facade, "f.txt", MoveHeaders::new(dav_url("g.txt")).overwrite("maybe")),
        Err(DavError::InvalidHeader { header: "Overwrite", .. })
    ));
    assert!(matches!(
        mv(&facade, "f.txt", MoveHeaders::new(dav_url("g.txt")).depth("0")),
        Err(DavError::InvalidHeader { header: "Depth", .. })
    ));
    let moved = mv(
        &facade,
        "f.txt",
        MoveHeaders::new(dav_url("g.txt")).depth("infinity"),
    )
    .unwrap();
    assert_eq!(moved.status, Status::Created);
}

#[test]
fn test_missing_intermediate_collection() {
    let (facade, _temp_dir) = setup_test_env();
    put_text(&facade, "f.txt", "x");
    let result = mv(&facade, "f.txt", MoveHeaders::new(dav_url("a/b/f.txt")));
    assert!(matches!(result, Err(DavError::HasNotParent(ref s)) if s == "a"));
}

#[test]
fn test_existing_destination_needs_overwrite() {
    let (facade, _temp_dir) = setup_test_env();
    put_text(&facade, "src.txt", "new");
    put_text(&facade, "dst.txt", "old");
    mkcol(&facade, "col", NodeType::WebdavCollection);

    assert!(matches!(
        mv(&facade, "src.txt", MoveHeaders::new(dav_url("dst.txt"))),
        Err(DavError::DestinationAlreadyExists)
    ));
    assert!(matches!(
        mv(&facade, "src.txt", MoveHeaders::new(dav_url("col")).overwrite("T")),
        Err(DavError::ResourceProhibitedToOverwrite)
    ));

    let src_id = facade.node(&dav("src.txt")).unwrap().id();
    let replaced = mv(
        &facade,
        "src.txt",
        MoveHeaders::new(dav_url("dst.txt")).overwrite("t"),
    )
    .unwrap();
    assert_eq!(replaced.status, Status::NoContent);
    let dst = facade.node(&dav("dst.txt")).unwrap();
    assert_eq!(dst.id(), src_id);
    let content = facade.get(&master(), &dav("dst.txt"), None).unwrap();
    assert_eq!(content.body, b"new");
}

#[test]
fn test_parent_type_restrictions() {
    let (facade, _temp_dir) = setup_test_env();
    put_text(&facade, "f.txt", "x");
    put_text(&facade, "file.txt", "y");
    mkcol(&facade, "odata", NodeType::ODataCollection);
    mkcol(&facade, "svc", NodeType::ServiceCollection);
    mkcol(&facade, "col", NodeType::WebdavCollection);

    assert!(matches!(
        mv(&facade, "f.txt", MoveHeaders::new(dav_url("file.txt/f.txt"))),
        Err(DavError::ProhibitedToMoveIntoFile)
    ));
    assert!(matches!(
        mv(&facade, "f.txt", MoveHeaders::new(dav_url("odata/f.txt"))),
        Err(DavError::ProhibitedToMoveIntoODataCollection)
    ));
    assert!(matches!(
        mv(&facade, "f.txt", MoveHeaders::new(dav_url("svc/f.txt"))),
        Err(DavError::ProhibitedToMoveIntoServiceCollection)
    ));
    assert!(matches!(
        mv(
            &facade,
            "f.txt",
            MoveHeaders::new(dav_url(&format!("svc/{SERVICE_SOURCE_COLLECTION}"))).overwrite("T")
        ),
        Err(DavError::ServiceSourceProhibitedToOverwrite)
    ));
    assert!(matches!(
        mv(
            &facade,
            "col",
            MoveHeaders::new(dav_url(&format!("svc/{SERVICE_SOURCE_COLLECTION}/col")))
        ),
        Err(DavError::ServiceSourceProhibitedToContainCollection)
    ));

    let moved = mv(
        &facade,
        "f.txt",
        MoveHeaders::new(dav_url(&format!("svc/{SERVICE_SOURCE_COLLECTION}/f.txt"))),
    )
    .unwrap();
    assert_eq!(moved.status, Status::Created);
}

#[test]
fn test_destination_parent_child_limit() {
    let (facade, _temp_dir) = setup_test_env_with(|config| config.max_child_resource_count = 2);
    mkcol(&facade, "full", NodeType::WebdavCollection);
    put_text(&facade, "full/a.txt", "a");
    put_text(&facade, "full/b.txt", "b");
    put_text(&facade, "c.txt", "c");

    assert!(matches!(
        mv(&facade, "c.txt", MoveHeaders::new(dav_url("full/c.txt"))),
        Err(DavError::CollectionChildResourceError(2))
    ));
    // replacing an existing child does not add one
    let replaced = mv(
        &facade,
        "c.txt",
        MoveHeaders::new(dav_url("full/a.txt")).overwrite("T"),
    )
    .unwrap();
    assert_eq!(replaced.status, Status::NoContent);
}

#[test]
fn test_if_match_on_source() {
    let (facade, _temp_dir) = setup_test_env();
    put_text(&facade, "f.txt", "x");
    let etag = facade.node(&dav("f.txt")).unwrap().etag().unwrap();

    assert!(matches!(
        mv(&facade, "f.txt", MoveHeaders::new(dav_url("g.txt")).if_match("\"7-7\"")),
        Err(DavError::EtagMismatch)
    ));
    let moved = mv(&facade, "f.txt", MoveHeaders::new(dav_url("g.txt")).if_match(etag.clone())).unwrap();
    assert_eq!(moved.etag, Some(etag));
}

#[test]
fn test_percent_encoded_destination() {
    let (facade, _temp_dir) = setup_test_env();
    put_text(&facade, "f.txt", "x");
    let moved = mv(&facade, "f.txt", MoveHeaders::new(dav_url("my%20file.txt"))).unwrap();
    assert_eq!(moved.status, Status::Created);
    assert!(facade.node(&dav("my file.txt")).unwrap().exists());
    assert_eq!(moved.location.unwrap().as_str(), dav_url("my%20file.txt"));
}

#[test]
fn test_service_source_stays_with_its_collection() {
    let (facade, _temp_dir) = setup_test_env();
    mkcol(&facade, "svc", NodeType::ServiceCollection);
    let src = format!("svc/{SERVICE_SOURCE_COLLECTION}");

    assert!(matches!(
        mv(&facade, &src, MoveHeaders::new(dav_url("stolen"))),
        Err(DavError::ServiceSourceProhibitedToMove)
    ));
    assert!(matches!(
        facade.delete(&master(), &dav(&src), None, true),
        Err(DavError::ServiceSourceProhibitedToMove)
    ));
    assert!(facade.node(&dav(&src)).unwrap().exists());
    assert!(!facade.node(&dav("stolen")).unwrap().exists());

    // the source area is still usable, and the whole service can go
    put_text(&facade, &format!("{src}/main.js"), "run()");
    let deleted = facade.delete(&master(), &dav("svc"), None, true).unwrap();
    assert_eq!(deleted.status, Status::NoContent);
}

#[test]
fn test_plain_folder_named_like_service_source_can_move() {
    let (facade, _temp_dir) = setup_test_env();
    mkcol(&facade, SERVICE_SOURCE_COLLECTION, NodeType::WebdavCollection);
    let moved = mv(
        &facade,
        SERVICE_SOURCE_COLLECTION,
        MoveHeaders::new(dav_url("renamed")),
    )
    .unwrap();
    assert_eq!(moved.status, Status::Created);
}
