use std::sync::{Arc, Mutex, MutexGuard};

use webapp::{
    controller::Controller,
    from_fn, sink, Application, Exception, ExceptionHandler, Handler, HandlerResult,
    HttpRequestMethod, Next, ParamValue, Request, Response,
};

type Trace = Arc<Mutex<Vec<String>>>;

static SINK_LOCK: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    match SINK_LOCK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn get(path: &str) -> Request {
    Request::new(HttpRequestMethod::Get, path)
}

fn recording(trace: &Trace, label: &'static str) -> Arc<dyn webapp::Interceptor> {
    let trace = Arc::clone(trace);
    from_fn(move |request: Request, next: &mut dyn Next| {
        trace.lock().unwrap().push(format!("{}-before", label));
        let response = next.handle(request);
        trace.lock().unwrap().push(format!("{}-after", label));
        response
    })
}

fn traced_application(trace: &Trace) -> Application {
    let mut app = Application::new();
    app.attach(recording(trace, "A"));
    app.attach(recording(trace, "B"));
    app.attach(recording(trace, "C"));
    let handler_trace = Arc::clone(trace);
    app.get(
        "/",
        Handler::function(move |_req| {
            handler_trace.lock().unwrap().push("T".to_string());
            Ok(Response::text("home"))
        }),
    )
    .unwrap();
    app
}

#[test]
fn test_onion_order() {
    let trace: Trace = Arc::default();
    let app = traced_application(&trace);

    let response = app.handle(get("/")).unwrap();

    assert_eq!(response.body(), b"home");
    assert_eq!(
        *trace.lock().unwrap(),
        vec!["A-before", "B-before", "C-before", "T", "C-after", "B-after", "A-after"]
    );
}

#[test]
fn test_unmatched_path_is_route_not_found() {
    let trace: Trace = Arc::default();
    let app = traced_application(&trace);

    let err = app.handle(get("/missing/page")).unwrap_err();

    assert_eq!(err.code(), 404);
    assert!(err.to_string().contains("/missing/page"));
    // 异常穿过了所有拦截器的 after 部分
    assert_eq!(trace.lock().unwrap().len(), 6);
}

#[test]
fn test_typed_params_are_injected() {
    let mut app = Application::new();
    app.get(
        "/user/{int:id}",
        Handler::function(|req: Request| {
            let id = req.params().and_then(|p| p.get("id")).cloned();
            assert_eq!(id, Some(ParamValue::Int(123)));
            Ok(Response::text("user"))
        }),
    )
    .unwrap();

    assert_eq!(app.handle(get("/user/123")).unwrap().body(), b"user");

    let err = app.handle(get("/user/abc")).unwrap_err();
    assert!(matches!(err, Exception::RouteNotFound { .. }));
    assert_eq!(err.code(), 404);
}

#[test]
fn test_identical_requests_are_idempotent() {
    let trace: Trace = Arc::default();
    let app = traced_application(&trace);

    let first = app.handle(get("/")).unwrap();
    let second = app.handle(get("/")).unwrap();

    assert_eq!(first, second);
    assert_eq!(trace.lock().unwrap().len(), 14);
}

#[test]
fn test_mount_path_is_stripped() {
    let mut app = Application::new();
    app.get("/api/users", Handler::function(|_req| Ok(Response::text("users"))))
        .unwrap();
    app.get(
        "/subdir/api/users",
        Handler::function(|_req| Ok(Response::text("unmounted"))),
    )
    .unwrap();

    let mounted = get("/subdir/api/users").with_server_param("SCRIPT_NAME", "/subdir/index.php");
    assert_eq!(app.handle(mounted).unwrap().body(), b"users");

    let unmounted = get("/subdir/api/users");
    assert_eq!(app.handle(unmounted).unwrap().body(), b"unmounted");
}

#[test]
fn test_mount_string_elsewhere_in_path_is_preserved() {
    let mut app = Application::new();
    app.get(
        "/files/{name}/subdir",
        Handler::function(|req: Request| {
            let name = req.params().and_then(|p| p.get("name")).map(ToString::to_string);
            Ok(Response::text(name.unwrap_or_default()))
        }),
    )
    .unwrap();

    let request =
        get("/subdir/files/report/subdir").with_server_param("SCRIPT_NAME", "/subdir/index.php");
    assert_eq!(app.handle(request).unwrap().body(), b"report");
}

#[test]
fn test_short_circuit_skips_later_stages() {
    let trace: Trace = Arc::default();
    let mut app = Application::new();
    app.attach(recording(&trace, "A"));
    app.attach(from_fn(|request: Request, next: &mut dyn Next| {
        if request.header("Authorization").is_none() {
            return Ok(Response::from_status_code(401, None));
        }
        next.handle(request)
    }));
    app.attach(recording(&trace, "C"));
    let handler_trace = Arc::clone(&trace);
    app.get(
        "/",
        Handler::function(move |_req| {
            handler_trace.lock().unwrap().push("T".to_string());
            Ok(())
        }),
    )
    .unwrap();

    let response = app.handle(get("/")).unwrap();
    assert_eq!(response.status_code(), 401);
    assert_eq!(*trace.lock().unwrap(), vec!["A-before", "A-after"]);

    trace.lock().unwrap().clear();
    let response = app.handle(get("/").with_header("Authorization", "Bearer x")).unwrap();
    assert_eq!(response.status_code(), 204);
    assert_eq!(
        *trace.lock().unwrap(),
        vec!["A-before", "C-before", "T", "C-after", "A-after"]
    );
}

#[test]
fn test_interceptor_can_recover_from_failure() {
    let mut app = Application::new();
    app.attach(from_fn(|request: Request, next: &mut dyn Next| {
        match next.handle(request) {
            Err(Exception::RouteNotFound { path }) => {
                Ok(Response::text(format!("fallback for {}", path)).with_status(404))
            }
            other => other,
        }
    }));

    let response = app.handle(get("/nothing")).unwrap();
    assert_eq!(response.status_code(), 404);
    assert_eq!(response.body(), b"fallback for /nothing");
}

struct Profiles {
    request: Request,
}

impl Controller for Profiles {
    fn new(request: Request) -> Self {
        Self { request }
    }

    fn dispatch(&mut self, action: &str, args: &[ParamValue]) -> Option<HandlerResult> {
        match action {
            "show" => {
                let id = args.first().and_then(ParamValue::as_u64).unwrap_or_default();
                Some(Ok(Some(Response::text(format!("profile {}", id)))))
            }
            "touch" => Some(Ok(None)),
            _ => None,
        }
    }

    fn request(&self) -> &Request {
        &self.request
    }
}

#[test]
fn test_controller_actions() {
    let mut app = Application::new();
    app.controller::<Profiles>("Profiles");
    app.get("/profiles/{uint:id}", Handler::action("Profiles", "show"))
        .unwrap();
    app.post("/profiles/{uint:id}", Handler::action("Profiles", "touch"))
        .unwrap();
    app.get("/profiles", Handler::controller("Profiles")).unwrap();
    app.get("/accounts", Handler::controller("Accounts")).unwrap();

    let response = app.handle(get("/profiles/9")).unwrap();
    assert_eq!(response.body(), b"profile 9");

    let response = app
        .handle(Request::new(HttpRequestMethod::Post, "/profiles/9"))
        .unwrap();
    assert_eq!(response, Response::no_content());

    let err = app.handle(get("/profiles")).unwrap_err();
    assert!(matches!(err, Exception::ActionNotFound { .. }));
    assert_eq!(err.code(), 501);

    let err = app.handle(get("/accounts")).unwrap_err();
    assert_eq!(err.to_string(), "Accounts is not available");
    assert_eq!(err.code(), 501);
}

#[test]
fn test_run_renders_error_page_through_sink() {
    let _guard = serial();
    sink::reset();

    let mut app = Application::new();
    app.attach(ExceptionHandler::new(false));
    app.get("/ghost", Handler::controller("Ghost")).unwrap();

    let response = app.run(get("/ghost").with_server_param("HTTP_HOST", "example.com"));
    sink::reset();

    let body = String::from_utf8_lossy(response.body()).to_string();
    assert_eq!(response.status_code(), 501);
    assert!(body.contains("HandlerUnavailable 501"));
    assert!(body.contains("Ghost is not available"));
    assert!(body.contains(r#"href="http://example.com""#));
}

#[test]
fn test_last_installed_sink_wins() {
    let _guard = serial();
    sink::reset();

    let mut app = Application::new();
    app.attach(ExceptionHandler::new(false));
    app.attach(ExceptionHandler::new(true));

    let response = app.run(get("/missing"));
    sink::reset();

    let body = String::from_utf8_lossy(response.body()).to_string();
    assert_eq!(response.status_code(), 404);
    assert!(body.contains("<hr><pre>"));
}

#[test]
fn test_failure_with_custom_code() {
    let _guard = serial();
    sink::reset();

    let mut app = Application::new();
    app.attach(ExceptionHandler::new(false));
    app.get(
        "/teapot",
        Handler::function(|_req| -> Result<(), Exception> {
            Err(Exception::failure(418, "short and stout"))
        }),
    )
    .unwrap();

    let response = app.run(get("/teapot"));
    sink::reset();

    assert_eq!(response.status_code(), 418);
    assert!(String::from_utf8_lossy(response.body()).contains("short and stout"));
}
