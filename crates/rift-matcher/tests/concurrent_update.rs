//! Integration tests for replacing expectations while they are matched

use rift_matcher::{Expectation, HttpRequest, MatcherConfig, OpenApiDefinition, RequestDefinition};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const SPEC: &str = r#"{
    "openapi": "3.0.0",
    "paths": {
        "/orders/{orderId}": {
            "get": {
                "operationId": "getOrder",
                "parameters": [{"name": "orderId", "in": "path", "required": true,
                                "schema": {"type": "integer", "minimum": 1}}]
            }
        }
    }
}"#;

fn openapi() -> RequestDefinition {
    OpenApiDefinition::new(SPEC).into()
}

fn explicit() -> RequestDefinition {
    HttpRequest::new().with_method("DELETE").with_path("/orders").into()
}

#[test]
fn test_matching_during_updates_sees_one_definition() {
    let expectation = Arc::new(Expectation::new(openapi(), MatcherConfig::default()).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let expectation = Arc::clone(&expectation);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let get = HttpRequest::new().with_method("GET").with_path("/orders/5");
                let delete = HttpRequest::new().with_method("DELETE").with_path("/orders");
                let mut checks = 0;
                while !done.load(Ordering::Relaxed) || checks == 0 {
                    let snapshot = expectation.snapshot();
                    let get_matches = snapshot.matcher.matches(None, &get.clone().into());
                    let delete_matches = snapshot.matcher.matches(None, &delete.clone().into());
                    assert!(get_matches ^ delete_matches);
                    checks += 1;
                }
                checks
            })
        })
        .collect();

    for i in 0..100 {
        let definition = if i % 2 == 0 { explicit() } else { openapi() };
        assert!(expectation.update(definition).unwrap());
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn test_failed_update_during_matching_keeps_serving() {
    let expectation = Arc::new(Expectation::new(openapi(), MatcherConfig::default()).unwrap());
    let reader = {
        let expectation = Arc::clone(&expectation);
        thread::spawn(move || {
            let request = HttpRequest::new().with_method("GET").with_path("/orders/5");
            (0..1000).all(|_| expectation.matches_request(&request))
        })
    };

    for _ in 0..20 {
        let broken = OpenApiDefinition::new(r##"{"openapi": "3.0.0", "paths": {"/a": {"get": {"operationId": "a",
            "parameters": [{"$ref": "#/components/parameters/Missing"}]}}}}"##);
        assert!(expectation.update(broken.into()).is_err());
    }
    assert!(reader.join().unwrap());
    assert_eq!(expectation.definition(), openapi());
}
