//! 命令行宿主
//!
//! 用终端输出代替页面渲染，令牌保存在本地 JSON 文件中。
//!
//! ```text
//! campuspool login <email> <password>
//! campuspool rider [seconds]
//! campuspool driver [seconds]
//! campuspool logout
//! ```

use campuspool::{
    AppRoute, AuthController, ClientConfig, ClientResult, Context, DriverController, FileStorage,
    FixedLocation, MemoryRouter, Notice, ReqwestHttpClient, RiderController, View, ViewUpdate,
};
use campuspool::shared::Coordinates;
use std::rc::Rc;
use std::time::Duration;

const DEFAULT_SESSION_FILE: &str = ".campuspool/session.json";
const DEFAULT_FOLLOW_SECS: u64 = 60;

struct ConsoleView {
    dismiss_after: Duration,
}

impl View for ConsoleView {
    fn render(&self, update: ViewUpdate) {
        println!("[view] {:?}", update);
    }

    fn notify(&self, notice: Notice) {
        match notice.auto_dismiss(self.dismiss_after) {
            Some(after) => println!(
                "[{:?}] {} (hides after {}s)",
                notice.level,
                notice.message,
                after.as_secs()
            ),
            None => println!("[{:?}] {}", notice.level, notice.message),
        }
    }
}

/// `CAMPUSPOOL_LOCATION=lng,lat`，未设置时使用校园坐标
fn device_location(config: &ClientConfig) -> Coordinates {
    std::env::var("CAMPUSPOOL_LOCATION")
        .ok()
        .and_then(|raw| {
            let (lng, lat) = raw.split_once(',')?;
            Some(Coordinates::new(
                lng.trim().parse().ok()?,
                lat.trim().parse().ok()?,
            ))
        })
        .unwrap_or(config.campus.coordinates)
}

fn build_context(router: Rc<MemoryRouter>) -> ClientResult<Context<ReqwestHttpClient>> {
    let config = ClientConfig::from_env();
    let session_file =
        std::env::var("CAMPUSPOOL_SESSION_FILE").unwrap_or_else(|_| DEFAULT_SESSION_FILE.into());
    let store = Rc::new(FileStorage::new(session_file));
    let view = Rc::new(ConsoleView {
        dismiss_after: config.notice_dismiss_after,
    });
    let locator = Rc::new(FixedLocation::new(device_location(&config)));
    Context::connect(config, store, router, view, locator)
}

fn follow_secs(arg: Option<&String>) -> Duration {
    Duration::from_secs(
        arg.and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FOLLOW_SECS),
    )
}

async fn run(args: Vec<String>) -> ClientResult<()> {
    let router = Rc::new(MemoryRouter::new(AppRoute::Login));
    let ctx = build_context(router.clone())?;

    match args.first().map(String::as_str) {
        Some("login") => {
            let (Some(email), Some(password)) = (args.get(1), args.get(2)) else {
                eprintln!("usage: campuspool login <email> <password>");
                return Ok(());
            };
            AuthController::new(ctx).login(email, password).await?;
        }
        Some("rider") => {
            let rider = RiderController::new(ctx);
            if rider.init().await {
                tokio::time::sleep(follow_secs(args.get(1))).await;
            }
            rider.teardown();
        }
        Some("driver") => {
            let driver = DriverController::new(ctx);
            if driver.init().await {
                tokio::time::sleep(follow_secs(args.get(1))).await;
            }
            driver.teardown();
        }
        Some("logout") => AuthController::new(ctx).logout().await,
        _ => {
            eprintln!("usage: campuspool <login|rider|driver|logout> [args]");
            return Ok(());
        }
    }

    tracing::info!(route = %router.current(), "done");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let local = tokio::task::LocalSet::new();
    if let Err(e) = local.run_until(run(args)).await {
        eprintln!("error [{}]: {}", e.error_code(), e.user_message());
        std::process::exit(1);
    }
}
