//! Disposable Postgres databases for integration tests.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow, bail};
use postgres::NoTls;
use url::Url;

/// Environment variable pointing at an existing server to create test databases on.
pub const TEST_DATABASE_URL_ENV: &str = "MEDIABRIDGE_TEST_DATABASE_URL";

/// A uniquely named database that is dropped (and its server stopped, when local) on drop.
pub struct TestDatabase {
    connection_string: String,
    admin_url: String,
    database: String,
    server: Option<LocalServer>,
}

impl TestDatabase {
    /// Connection string for `sqlx` or any other client.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        let _ = run_admin(&self.admin_url, format!("DROP DATABASE IF EXISTS \"{}\"", self.database));
        if let Some(server) = self.server.take() {
            server.stop();
        }
    }
}

struct LocalServer {
    process: Child,
    data_dir: PathBuf,
}

impl LocalServer {
    fn stop(mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
        let _ = fs::remove_dir_all(&self.data_dir);
    }
}

/// Create a fresh database for one test.
///
/// Uses the server named by `MEDIABRIDGE_TEST_DATABASE_URL` when set, otherwise spawns
/// a throwaway cluster from local `initdb`/`postgres`/`pg_isready` binaries. Callers
/// usually skip the test when this returns an error.
///
/// # Errors
///
/// Returns an error when no server is configured and local binaries are missing or
/// fail to start, or when the database cannot be created.
pub fn start_postgres() -> Result<TestDatabase> {
    if let Ok(url) = std::env::var(TEST_DATABASE_URL_ENV) {
        return create_database_on(&url, None);
    }
    let (server, url) = spawn_local_server()?;
    create_database_on(&url, Some(server))
}

fn create_database_on(server_url: &str, server: Option<LocalServer>) -> Result<TestDatabase> {
    let parsed = Url::parse(server_url).context("invalid postgres connection url")?;
    let database = unique_name();

    let mut admin = parsed.clone();
    admin.set_path("/postgres");
    let mut candidates = vec![admin.to_string()];
    if admin.path() != parsed.path() {
        candidates.push(parsed.to_string());
    }

    let mut failure = None;
    for admin_url in candidates {
        match run_admin(&admin_url, format!("CREATE DATABASE \"{database}\"")) {
            Ok(()) => {
                let mut target = parsed.clone();
                target.set_path(&format!("/{database}"));
                return Ok(TestDatabase {
                    connection_string: target.to_string(),
                    admin_url,
                    database,
                    server,
                });
            }
            Err(err) => failure = Some(err),
        }
    }
    if let Some(server) = server {
        server.stop();
    }
    Err(failure.unwrap_or_else(|| anyhow!("failed to create test database")))
}

// The blocking client must not run on a tokio worker thread.
fn run_admin(admin_url: &str, statement: String) -> Result<()> {
    let admin_url = admin_url.to_string();
    thread::spawn(move || -> Result<()> {
        let mut client = postgres::Config::from_str(&admin_url)?.connect(NoTls)?;
        client
            .simple_query(&statement)
            .map(|_| ())
            .with_context(|| format!("failed to run `{statement}`"))
    })
    .join()
    .unwrap_or_else(|_| Err(anyhow!("admin statement thread panicked")))
}

fn spawn_local_server() -> Result<(LocalServer, String)> {
    let initdb = find_binary("initdb")?;
    let postgres = find_binary("postgres")?;
    let pg_isready = find_binary("pg_isready")?;

    let port = free_port()?;
    let data_dir = std::env::temp_dir().join(unique_name());
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let data_arg = data_dir
        .to_str()
        .context("data dir contains non-utf8 characters")?
        .to_string();

    let status = Command::new(&initdb)
        .args(["-D", &data_arg, "--username=postgres", "--auth=trust"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("failed to run initdb")?;
    if !status.success() {
        let _ = fs::remove_dir_all(&data_dir);
        bail!("initdb exited with failure status");
    }

    let process = Command::new(&postgres)
        .args(["-D", &data_arg, "-p", &port.to_string(), "-h", "127.0.0.1"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to start postgres")?;
    let server = LocalServer { process, data_dir };

    if let Err(err) = wait_until_ready(&pg_isready, port) {
        server.stop();
        return Err(err);
    }
    Ok((server, format!("postgres://postgres@127.0.0.1:{port}/postgres")))
}

fn find_binary(name: &str) -> Result<PathBuf> {
    let from_path = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();
    let well_known = [
        "/usr/lib/postgresql/16/bin",
        "/usr/local/opt/postgresql@16/bin",
        "/opt/homebrew/opt/postgresql@16/bin",
    ]
    .map(PathBuf::from);

    from_path
        .into_iter()
        .chain(well_known)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| anyhow!("{name} binary is required for Postgres tests"))
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("failed to reserve port")?;
    Ok(listener.local_addr().context("failed to read port")?.port())
}

fn wait_until_ready(pg_isready: &Path, port: u16) -> Result<()> {
    let port = port.to_string();
    for _ in 0..30 {
        let ready = Command::new(pg_isready)
            .args(["-h", "127.0.0.1", "-p", &port, "-U", "postgres"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success());
        if ready {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(200));
    }
    bail!("postgres did not become ready in time")
}

fn unique_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("mediabridge_test_{}_{nanos}", std::process::id())
}
