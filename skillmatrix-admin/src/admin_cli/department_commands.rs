use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use skillmatrix_api::models::Department;
use skillmatrix_api::orm::department::{delete_department, insert_department, list_departments};

use super::utils::{confirm, filter_matching};

#[derive(Subcommand)]
pub enum DepartmentAction {
    #[command(about = "Add a new department")]
    Add {
        #[arg(help = "Department name")]
        name: String,
    },
    #[command(about = "List departments, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
    },
    #[command(about = "Remove departments matching search term, with their lines, teams and stations")]
    Rm {
        #[arg(help = "Search term to match departments for removal (regex by default, use -F for fixed string)")]
        search_term: String,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
}

pub fn handle_department_command_with_conn(
    conn: &mut SqliteConnection,
    action: DepartmentAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DepartmentAction::Add { name } => {
            let department = add_department_impl(conn, &name)?;
            println!("Department created successfully!");
            println!("ID: {}", department.id);
            println!("Name: {}", department.name);
        }
        DepartmentAction::Ls {
            search_term,
            fixed_string,
        } => {
            let departments = list_departments_impl(conn, search_term.as_deref(), fixed_string)?;
            if departments.is_empty() {
                println!("No departments found.");
            } else {
                println!("Departments:");
                for department in departments {
                    println!(
                        "  ID: {}, Name: {}, Created: {}",
                        department.id, department.name, department.created_at
                    );
                }
            }
        }
        DepartmentAction::Rm {
            search_term,
            fixed_string,
            yes,
        } => {
            let matching = list_departments_impl(conn, Some(&search_term), fixed_string)?;
            if matching.is_empty() {
                println!("No departments found matching the search term.");
                return Ok(());
            }
            println!("Found {} department(s) matching the search term:", matching.len());
            for department in &matching {
                println!("  ID: {}, Name: {}", department.id, department.name);
            }
            if !yes
                && !confirm(&format!(
                    "Delete these {} department(s) and everything below them?",
                    matching.len()
                ))?
            {
                println!("Operation cancelled.");
                return Ok(());
            }
            let deleted = remove_departments_impl(conn, &matching)?;
            println!("Successfully deleted {} department(s).", deleted);
        }
    }
    Ok(())
}

pub fn add_department_impl(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Department, Box<dyn std::error::Error>> {
    if name.trim().is_empty() {
        return Err("Department name cannot be empty".into());
    }
    Ok(insert_department(conn, name)?)
}

pub fn list_departments_impl(
    conn: &mut SqliteConnection,
    search_term: Option<&str>,
    fixed_string: bool,
) -> Result<Vec<Department>, Box<dyn std::error::Error>> {
    let departments = list_departments(conn)?;
    match search_term {
        Some(term) => filter_matching(departments, term, fixed_string, |d| d.name.as_str()),
        None => Ok(departments),
    }
}

pub fn remove_departments_impl(
    conn: &mut SqliteConnection,
    departments: &[Department],
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut deleted = 0;
    for department in departments {
        deleted += delete_department(conn, department.id)?;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillmatrix_api::orm::production_line::{insert_production_line, list_production_lines};
    use skillmatrix_api::orm::testing::setup_test_db;

    #[test]
    fn add_list_and_remove() {
        let mut conn = setup_test_db();
        assert!(add_department_impl(&mut conn, "  ").is_err());
        let assembly = add_department_impl(&mut conn, " Assembly ").unwrap();
        assert_eq!(assembly.name, "Assembly");
        add_department_impl(&mut conn, "Paint Shop").unwrap();
        insert_production_line(&mut conn, "Line 1", assembly.id).unwrap();

        let found = list_departments_impl(&mut conn, Some("^Ass"), false).unwrap();
        assert_eq!(found.len(), 1);

        assert_eq!(remove_departments_impl(&mut conn, &found).unwrap(), 1);
        let left = list_departments_impl(&mut conn, None, false).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "Paint Shop");
        assert!(list_production_lines(&mut conn, None).unwrap().is_empty());
    }
}
