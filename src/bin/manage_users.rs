//! CLI tool to manage users and their keys.
//!
//! Usage:
//!   cargo run --bin manage-users -- create --username <name> [--role <role>]
//!   cargo run --bin manage-users -- list
//!   cargo run --bin manage-users -- revoke --id <user-id>

use std::env;

use casetrack_lib::config::Config;
use casetrack_lib::db::DbPool;
use casetrack_lib::models::Role;
use casetrack_lib::models::user::UserResponse;
use casetrack_lib::services::user_keys;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    match command.as_str() {
        "create" => {
            let Some(username) = find_arg(&args, "--username", "-u") else {
                eprintln!("Error: --username is required");
                std::process::exit(1);
            };
            let role = match find_arg(&args, "--role", "-r") {
                None => Role::default(),
                Some(r) => match Role::parse(&r) {
                    Some(role) => role,
                    None => {
                        eprintln!("Error: unknown role '{}' (admin, manager, tester, viewer)", r);
                        std::process::exit(1);
                    }
                },
            };
            create_user(&pool, &username, role).await;
        }
        "list" | "ls" => list_users(&pool).await,
        "revoke" => {
            let id = parse_id_arg(&args);
            revoke_user(&pool, id).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn find_arg(args: &[String], long: &str, short: &str) -> Option<String> {
    args.windows(2)
        .skip(1)
        .find(|pair| pair[0] == long || pair[0] == short)
        .map(|pair| pair[1].clone())
}

fn parse_id_arg(args: &[String]) -> i64 {
    match find_arg(args, "--id", "-i").map(|s| s.parse::<i64>()) {
        Some(Ok(id)) => id,
        Some(Err(_)) => {
            eprintln!("Error: --id must be a number");
            std::process::exit(1);
        }
        None => {
            eprintln!("Error: --id is required");
            std::process::exit(1);
        }
    }
}

async fn create_user(pool: &DbPool, username: &str, role: Role) {
    match user_keys::create_user(pool, username, role).await {
        Ok((user, key)) => {
            println!();
            println!("User created: {} (id {}, role {})", user.username, user.id, role);
            println!();
            println!("  API key: {}", key);
            println!();
            println!("Store this key now. It cannot be shown again.");
            println!();
        }
        Err(e) => {
            eprintln!("Error creating user: {}", e);
            std::process::exit(1);
        }
    }
}

async fn list_users(pool: &DbPool) {
    let users = match pool.list_users().await {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Error listing users: {}", e);
            std::process::exit(1);
        }
    };

    if users.is_empty() {
        println!("No users found.");
        return;
    }

    println!();
    println!(
        "{:<8} {:<24} {:<12} {:<10} {:<10}",
        "ID", "USERNAME", "PREFIX", "ROLE", "STATUS"
    );
    println!("{}", "-".repeat(68));

    for user in users {
        let item = UserResponse::from(user);
        let status = if item.is_revoked { "revoked" } else { "active" };

        let username = if item.username.chars().count() > 22 {
            format!("{}...", item.username.chars().take(19).collect::<String>())
        } else {
            item.username.clone()
        };

        println!(
            "{:<8} {:<24} {:<12} {:<10} {:<10}",
            item.id,
            username,
            item.key_prefix,
            item.role.as_str(),
            status
        );
    }
    println!();
}

async fn revoke_user(pool: &DbPool, id: i64) {
    match pool.revoke_user(id).await {
        Ok(true) => {
            println!("User {} revoked successfully.", id);
        }
        Ok(false) => {
            eprintln!("User {} is already revoked.", id);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error revoking user: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: manage-users <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  create --username <name> [--role <role>]   Create a user and print its key");
    eprintln!("  list, ls                                   List all users");
    eprintln!("  revoke --id <id>                           Revoke a user's key");
    eprintln!("  help                                       Show this help");
    eprintln!();
    eprintln!("Roles: admin, manager, tester (default), viewer");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  manage-users create --username alice --role manager");
    eprintln!("  manage-users list");
    eprintln!("  manage-users revoke --id 3");
    eprintln!();
}
