use std::io::Read;
use std::thread;

use tiny_http::{Header, Response, Server};

use otdata_client::{Credentials, Deployment, Middleware, Mode, RemoteMiddleware};
use otdata_core::Error;

const EXPORT_HTML: &str = r#"<html><body>
<h1>Data export</h1>
<a href="/ExportApp/matching_pennies">matching_pennies data</a>
<a href="/ExportAppDocs/matching_pennies">matching_pennies docs</a>
<a href="/ExportApp/survey">survey data</a>
<a href="/ExportAppDocs/survey">survey docs</a>
</body></html>"#;

const CREATE_SESSION_HTML: &str = r#"<html><body>
<select name="session_config">
  <option value="">---</option>
  <option value="matching_pennies">Matching Pennies</option>
  <option value="full_run">Full run</option>
</select>
</body></html>"#;

const WIDE_CSV: &str =
    "participant.code,session.code,matching_pennies.1.player.payoff\np1,s1,2\np2,s1,0\n";
const APP_CSV: &str = "participant.code,penny_side\np1,heads\np2,tails\n";

#[derive(Clone, Copy)]
struct FakeConfig {
    protected: bool,
    no_apps: bool,
}

fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap()
}

fn redirect(to: &str) -> tiny_http::ResponseBox {
    Response::from_string("")
        .with_status_code(302)
        .with_header(header("Location", to))
        .boxed()
}

/// In-process stand-in for a running deployment: CSRF login form, export
/// landing page, session-creation page, and the fixed export endpoints.
fn start_fake_otree(config: FakeConfig) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let method = request.method().to_string();
            let url = request.url().to_string();
            let cookies = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Cookie"))
                .map(|h| h.value.as_str().to_string())
                .unwrap_or_default();
            let logged_in = !config.protected || cookies.contains("sessionid=sess1");

            let response: tiny_http::ResponseBox = if method == "GET"
                && url.starts_with("/accounts/login/")
            {
                Response::from_string("<form>login</form>")
                    .with_header(header("Set-Cookie", "csrftoken=tok123; Path=/"))
                    .boxed()
            } else if method == "POST" && url.starts_with("/accounts/login/") {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                if body.contains("username=admin")
                    && body.contains("password=secret")
                    && body.contains("csrfmiddlewaretoken=tok123")
                {
                    Response::from_string("")
                        .with_status_code(302)
                        .with_header(header("Location", "/export"))
                        .with_header(header("Set-Cookie", "sessionid=sess1; Path=/"))
                        .boxed()
                } else {
                    redirect("/accounts/login/")
                }
            } else if !logged_in {
                redirect("/accounts/login/?next=/export")
            } else if url == "/export" {
                let html = if config.no_apps {
                    "<html><body>No sessions yet.</body></html>"
                } else {
                    EXPORT_HTML
                };
                Response::from_string(html).boxed()
            } else if url == "/create_session" {
                Response::from_string(CREATE_SESSION_HTML).boxed()
            } else if url == "/ExportWide" {
                Response::from_string(WIDE_CSV).boxed()
            } else if url == "/ExportTimeSpent" {
                Response::from_string("").boxed()
            } else if url == "/ExportApp/matching_pennies" {
                Response::from_string(APP_CSV).boxed()
            } else if url == "/ExportAppDocs/matching_pennies" {
                Response::from_string("Matching pennies: one row per player per round.").boxed()
            } else {
                Response::from_string("not found").with_status_code(404).boxed()
            };
            let _ = request.respond(response);
        }
    });
    format!("http://{addr}")
}

fn open_fake() -> String {
    start_fake_otree(FakeConfig {
        protected: false,
        no_apps: false,
    })
}

#[test]
fn discovers_apps_from_the_export_page() {
    let base = open_fake();
    let remote = RemoteMiddleware::open(&base, None).unwrap();
    assert_eq!(
        remote.apps().unwrap().unwrap(),
        ["matching_pennies", "survey"]
    );
    // cached for the instance's lifetime
    assert_eq!(
        remote.apps().unwrap().unwrap(),
        ["matching_pennies", "survey"]
    );
}

#[test]
fn no_discoverable_apps_is_a_soft_signal() {
    let base = start_fake_otree(FakeConfig {
        protected: false,
        no_apps: true,
    });
    let remote = RemoteMiddleware::open(&base, None).unwrap();
    assert!(remote.apps().unwrap().is_none());
    // without a discovered list the name cannot be validated client-side;
    // the endpoint itself decides, and an unknown app is a transport failure
    let err = remote.app_data("unknown_app").unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
}

#[test]
fn discovers_session_names_from_the_creation_page() {
    let base = open_fake();
    let remote = RemoteMiddleware::open(&base, None).unwrap();
    assert_eq!(
        remote.session_names().unwrap(),
        ["matching_pennies", "full_run"]
    );
}

#[test]
fn login_with_valid_credentials() {
    let base = start_fake_otree(FakeConfig {
        protected: true,
        no_apps: false,
    });
    let credentials = Credentials {
        username: "admin".to_string(),
        password: "secret".to_string(),
    };
    let remote = RemoteMiddleware::open(&base, Some(&credentials)).unwrap();
    let wide = remote.all_data().unwrap();
    assert_eq!(wide.column_count(), 3);
    assert_eq!(wide.row_count(), 2);
}

#[test]
fn wrong_credentials_fail_at_construction() {
    let base = start_fake_otree(FakeConfig {
        protected: true,
        no_apps: false,
    });
    let credentials = Credentials {
        username: "admin".to_string(),
        password: "wrong".to_string(),
    };
    let err = RemoteMiddleware::open(&base, Some(&credentials)).unwrap_err();
    assert!(matches!(err, Error::NotLoggedIn { .. }));
}

#[test]
fn missing_credentials_against_a_protected_deployment() {
    let base = start_fake_otree(FakeConfig {
        protected: true,
        no_apps: false,
    });
    let err = RemoteMiddleware::open(&base, None).unwrap_err();
    match err {
        Error::NotLoggedIn { url } => assert!(url.contains("export")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn exports_parse_to_tables() {
    let base = open_fake();
    let remote = RemoteMiddleware::open(&base, None).unwrap();

    let wide = remote.all_data().unwrap();
    assert_eq!(
        wide.columns(),
        [
            "participant.code",
            "session.code",
            "matching_pennies.1.player.payoff"
        ]
    );

    // empty export body means "no rows yet", not an error
    let timing = remote.time_spent().unwrap();
    assert!(timing.is_empty());

    let table = remote.app_data("matching_pennies").unwrap();
    assert_eq!(table.column("penny_side").unwrap(), vec!["heads", "tails"]);

    let doc = remote.app_doc("matching_pennies").unwrap();
    assert!(doc.contains("one row per player"));
}

#[test]
fn unknown_apps_are_rejected_against_the_discovered_list() {
    let base = open_fake();
    let remote = RemoteMiddleware::open(&base, None).unwrap();
    assert!(matches!(
        remote.app_data("public_goods").unwrap_err(),
        Error::InvalidApp(ref a) if a == "public_goods"
    ));
    assert!(matches!(
        remote.app_doc("public_goods").unwrap_err(),
        Error::InvalidApp(_)
    ));
}

#[test]
fn process_level_operations_are_not_supported_remotely() {
    let base = open_fake();
    let remote = RemoteMiddleware::open(&base, None).unwrap();
    assert!(matches!(
        remote.session_config("matching_pennies").unwrap_err(),
        Error::NotSupported {
            operation: "session_config",
            ..
        }
    ));
    assert!(matches!(
        remote.bot_data("matching_pennies", Some(2)).unwrap_err(),
        Error::NotSupported {
            operation: "bot_data",
            ..
        }
    ));
}

#[test]
fn facade_classifies_urls_as_remote() {
    let base = open_fake();
    let deployment = Deployment::open(&base, Mode::Auto, None).unwrap();
    assert!(matches!(deployment, Deployment::Remote(_)));
    assert_eq!(
        deployment.apps().unwrap().unwrap(),
        ["matching_pennies", "survey"]
    );
    assert!(deployment.location().starts_with("http://"));
}
