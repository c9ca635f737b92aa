//! typedcache Shell
//!
//! Line-oriented shell over a typedcache client backed by an in-process
//! cluster. Reads commands from stdin, one per line.

use std::io::{self, BufRead, Write};

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};
use typedcache::config::Distribution;
use typedcache::{CacheError, Client, Config, MemoryCluster, MemoryDriver, Value, DEFAULT_OFFSET};

const HELP: &str = "\
commands:
  set|add|replace <key> <value> [exp]   store a value
  append|prepend <key> <bytes>          raw concatenation
  get <key>                             fetch one key
  mget <key> [key ...]                  batch fetch
  delete <key> [hold]                   remove a key
  incr|decr <key> [offset]              adjust a counter
  flush [delay]                         invalidate everything
  stats                                 per-server statistics
  servers                               list the pool
  add-server <spec>                     add servers, e.g. host:11211,host2
  down|up <host:port>                   toggle a server's reachability
  tick <seconds>                        advance the cluster clock
  help | quit
values: n:<number>  b:true|false  nil  j:<json>  r:<raw>  anything else is raw";

/// typedcache shell
#[derive(Parser, Debug)]
#[command(name = "typedcache-shell")]
#[command(about = "Interactive shell for the typedcache client over an in-process cluster")]
#[command(version)]
struct Args {
    /// Server spec, repeatable (e.g. "127.0.0.1:11211,127.0.0.1:11212")
    #[arg(short, long = "server", default_value = "127.0.0.1:11211")]
    servers: Vec<String>,

    /// Servers ("host:port") that start unreachable
    #[arg(long = "down")]
    down: Vec<String>,

    /// Key distribution across the pool
    #[arg(short, long, value_enum, default_value = "consistent")]
    distribution: DistributionArg,

    /// Print values and stats as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DistributionArg {
    Consistent,
    Modula,
}

impl From<DistributionArg> for Distribution {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Consistent => Distribution::Consistent,
            DistributionArg::Modula => Distribution::Modula,
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,typedcache=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("typedcache shell v{}", typedcache::VERSION);

    let mut builder = Config::builder().distribution(args.distribution.into());
    for spec in &args.servers {
        builder = builder.server(spec.as_str());
    }
    let config = builder.build();

    let cluster = MemoryCluster::new();
    for label in &args.down {
        cluster.set_down(label, true);
    }

    let driver = MemoryDriver::connect(&cluster, &config);
    let mut shell = match Client::new(driver, config) {
        Ok(client) => Shell {
            client,
            cluster,
            json: args.json,
        },
        Err(e) => {
            tracing::error!("Failed to create client: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = shell.run() {
        tracing::error!("Shell error: {}", e);
        std::process::exit(1);
    }
}

struct Shell {
    client: Client<MemoryDriver>,
    cluster: MemoryCluster,
    json: bool,
}

impl Shell {
    fn run(&mut self) -> typedcache::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        for line in stdin.lock().lines() {
            let line = line?;
            let words: Vec<&str> = line.split_whitespace().collect();
            let Some((&command, rest)) = words.split_first() else {
                continue;
            };
            if command == "quit" || command == "exit" {
                break;
            }

            match self.execute(command, rest) {
                Ok(output) => writeln!(stdout, "{}", output)?,
                Err(e) => writeln!(stdout, "ERROR {}", e)?,
            }
            stdout.flush()?;
        }
        Ok(())
    }

    fn execute(&mut self, command: &str, args: &[&str]) -> typedcache::Result<String> {
        let default_exp = self.client.config().default_expiration;
        match (command, args) {
            ("set", [key, value, exp @ ..]) => {
                let exp = optional_u32(exp, default_exp)?;
                self.client.set(key.as_bytes(), parse_value(value)?, exp)?;
                Ok("STORED".to_string())
            }
            ("add", [key, value, exp @ ..]) => {
                let exp = optional_u32(exp, default_exp)?;
                let stored = self.client.add(key.as_bytes(), parse_value(value)?, exp)?;
                Ok(stored_reply(stored))
            }
            ("replace", [key, value, exp @ ..]) => {
                let exp = optional_u32(exp, default_exp)?;
                let stored = self.client.replace(key.as_bytes(), parse_value(value)?, exp)?;
                Ok(stored_reply(stored))
            }
            ("append", [key, data]) => {
                self.client.append(key.as_bytes(), data.as_bytes())?;
                Ok("STORED".to_string())
            }
            ("prepend", [key, data]) => {
                self.client.prepend(key.as_bytes(), data.as_bytes())?;
                Ok("STORED".to_string())
            }
            ("get", [key]) => {
                let value = self.client.get(key.as_bytes())?;
                Ok(self.render(&value))
            }
            ("mget", keys) if !keys.is_empty() => {
                let result = self.client.fetch_multi(keys)?;
                let mut entries: Vec<_> = result.values.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut lines: Vec<String> = entries
                    .into_iter()
                    .map(|(key, value)| {
                        format!("{} = {}", String::from_utf8_lossy(key), self.render(value))
                    })
                    .collect();
                for (key, err) in &result.failures {
                    lines.push(format!("{} ! {}", String::from_utf8_lossy(key), err));
                }
                lines.push(format!("({} of {} found)", result.len(), keys.len()));
                Ok(lines.join("\n"))
            }
            ("delete", [key, hold @ ..]) => {
                let hold = optional_u32(hold, 0)?;
                let deleted = self.client.delete(key.as_bytes(), hold)?;
                Ok(if deleted { "DELETED" } else { "NOT_FOUND" }.to_string())
            }
            ("incr", [key, offset @ ..]) => {
                let offset = optional_u64(offset, DEFAULT_OFFSET)?;
                Ok(self.client.incr(key.as_bytes(), offset)?.to_string())
            }
            ("decr", [key, offset @ ..]) => {
                let offset = optional_u64(offset, DEFAULT_OFFSET)?;
                Ok(self.client.decr(key.as_bytes(), offset)?.to_string())
            }
            ("flush", delay) => {
                let delay = optional_u32(delay, 0)?;
                self.client.flush_all(delay);
                Ok("OK".to_string())
            }
            ("stats", []) => Ok(self.render_stats()),
            ("servers", []) => {
                let servers = self.client.servers();
                if self.json {
                    return serde_json::to_string_pretty(&servers)
                        .map_err(|e| CacheError::Serialization(e.to_string()));
                }
                Ok(servers
                    .iter()
                    .map(|s| format!("{} (weight {})", s, s.weight))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            ("add-server", [spec]) => {
                let added = self.client.add_server(spec)?;
                Ok(format!("added {} server(s)", added))
            }
            ("down", [label]) => {
                self.cluster.set_down(label, true);
                Ok("OK".to_string())
            }
            ("up", [label]) => {
                self.cluster.set_down(label, false);
                Ok("OK".to_string())
            }
            ("tick", [seconds]) => {
                let seconds = parse_number::<u64>(seconds)?;
                self.cluster.advance_clock(seconds);
                Ok(format!("clock at {}", self.cluster.now()))
            }
            ("help", _) => Ok(HELP.to_string()),
            _ => Err(CacheError::InvalidState(format!(
                "unrecognized command {:?} (try \"help\")",
                command
            ))),
        }
    }

    fn render(&self, value: &Value) -> String {
        if self.json {
            return value.to_json().to_string();
        }
        match value {
            Value::Raw(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Value::Number(n) => n.to_string(),
            Value::Nil => "nil".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Generic(document) => document.to_string(),
        }
    }

    fn render_stats(&mut self) -> String {
        let table = self.client.stats();
        if self.json {
            return serde_json::Value::from(
                table
                    .into_iter()
                    .map(|(server, stats)| {
                        let stats: serde_json::Map<String, serde_json::Value> = stats
                            .into_iter()
                            .map(|(k, v)| (k, serde_json::Value::String(v)))
                            .collect();
                        (server, serde_json::Value::Object(stats))
                    })
                    .collect::<serde_json::Map<_, _>>(),
            )
            .to_string();
        }

        let mut servers: Vec<_> = table.into_iter().collect();
        servers.sort_by(|a, b| a.0.cmp(&b.0));
        let mut out = Vec::new();
        for (server, stats) in servers {
            out.push(format!("[{}]", server));
            let mut stats: Vec<_> = stats.into_iter().collect();
            stats.sort();
            for (name, value) in stats {
                out.push(format!("  {} = {}", name, value));
            }
        }
        if out.is_empty() {
            out.push("(no servers answered)".to_string());
        }
        out.join("\n")
    }
}

/// Parse a shell value literal
fn parse_value(text: &str) -> typedcache::Result<Value> {
    if let Some(number) = text.strip_prefix("n:") {
        return Ok(Value::Number(parse_number::<f64>(number)?));
    }
    if let Some(flag) = text.strip_prefix("b:") {
        return Ok(Value::Boolean(parse_number::<bool>(flag)?));
    }
    if let Some(json) = text.strip_prefix("j:") {
        return Ok(Value::Generic(serde_json::from_str(json)?));
    }
    if let Some(raw) = text.strip_prefix("r:") {
        return Ok(Value::from(raw));
    }
    if text == "nil" {
        return Ok(Value::Nil);
    }
    Ok(Value::from(text))
}

fn parse_number<T: std::str::FromStr>(text: &str) -> typedcache::Result<T> {
    text.parse::<T>()
        .map_err(|_| CacheError::InvalidState(format!("cannot parse {:?}", text)))
}

fn optional_u32(args: &[&str], default: u32) -> typedcache::Result<u32> {
    match args {
        [] => Ok(default),
        [text] => parse_number(text),
        _ => Err(CacheError::InvalidState("too many arguments".to_string())),
    }
}

fn optional_u64(args: &[&str], default: u64) -> typedcache::Result<u64> {
    match args {
        [] => Ok(default),
        [text] => parse_number(text),
        _ => Err(CacheError::InvalidState("too many arguments".to_string())),
    }
}

fn stored_reply(stored: bool) -> String {
    let reply = if stored { "STORED" } else { "NOT_STORED" };
    reply.to_string()
}
