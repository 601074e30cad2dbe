use std::io::{self, Write};

use diesel::{connection::SimpleConnection, prelude::*, sqlite::SqliteConnection};
use dotenvy::dotenv;
use regex::Regex;
use skillmatrix_api::{
    models::{Team, User},
    orm::{team::get_team, user::get_user_by_email},
};

pub fn establish_connection() -> Result<SqliteConnection, Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let mut conn = SqliteConnection::establish(&database_url)?;
    conn.batch_execute("PRAGMA foreign_keys = ON")?;
    Ok(conn)
}

/// Keeps the items whose key matches `term`, as a regex or, with
/// `fixed_string`, as a plain substring.
pub fn filter_matching<T, F>(
    items: Vec<T>,
    term: &str,
    fixed_string: bool,
    key: F,
) -> Result<Vec<T>, Box<dyn std::error::Error>>
where
    F: Fn(&T) -> &str,
{
    if fixed_string {
        return Ok(items.into_iter().filter(|item| key(item).contains(term)).collect());
    }
    let regex =
        Regex::new(term).map_err(|e| format!("Invalid regex pattern '{}': {}", term, e))?;
    Ok(items.into_iter().filter(|item| regex.is_match(key(item))).collect())
}

pub fn require_user(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<User, Box<dyn std::error::Error>> {
    get_user_by_email(conn, email)?
        .ok_or_else(|| format!("User with email '{}' not found", email).into())
}

pub fn require_team(
    conn: &mut SqliteConnection,
    team_id: i32,
) -> Result<Team, Box<dyn std::error::Error>> {
    get_team(conn, team_id)?.ok_or_else(|| format!("Team with ID {} does not exist", team_id).into())
}

/// Asks for a y/N answer on stdin.
pub fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_regex_or_substring() {
        let emails = vec!["ann@plant.example", "bob@plant.example", "a.b@other.example"];

        let by_regex = filter_matching(emails.clone(), "^a", false, |e| *e).unwrap();
        assert_eq!(by_regex, vec!["ann@plant.example", "a.b@other.example"]);

        let literal = filter_matching(emails.clone(), "a.b", true, |e| *e).unwrap();
        assert_eq!(literal, vec!["a.b@other.example"]);

        assert!(filter_matching(emails, "(", false, |e| *e).is_err());
    }
}
