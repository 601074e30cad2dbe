//! TypeScript type generation module.
//!
//! Exports TypeScript definitions for the request and response types of the
//! API.  Runs as a test; the output directory is taken from
//! `SKILLMATRIX_TS_OUTPUT_DIR` and defaults to `../ts-bindings`.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        let output_dir_str =
            env::var("SKILLMATRIX_TS_OUTPUT_DIR").unwrap_or_else(|_| "../ts-bindings".to_string());
        let output_dir = Path::new(&output_dir_str);

        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir).expect("Failed to create output directory");
        }

        // Remove stale definitions so renamed types do not linger.
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path)
                    .unwrap_or_else(|e| panic!("Failed to remove {:?}: {}", path, e));
            }
        }

        use crate::access::Grant;
        use crate::api::ErrorResponse;
        use crate::api::contact::{ContactRequest, MailFailure, MailSent, QuoteRequest};
        use crate::api::login::LoginSuccessResponse;
        use crate::api::report::StationGapRequest;
        use crate::api::status::HealthStatus;
        use crate::feed::ChangeEvent;
        use crate::feed::consumer::ConnectionState;
        use crate::matrix::{MatrixContext, TeamMatrix};
        use crate::models::*;
        use crate::rating::{RatingEdit, RatingOutcome};
        use crate::report::{StationGap, StationRatingSummary, TeamStatistics};

        // Dependencies of each type are exported along with it.
        UserView::export_all_to(output_dir).expect("Failed to export UserView type");
        UserInput::export_all_to(output_dir).expect("Failed to export UserInput type");
        UserUpdate::export_all_to(output_dir).expect("Failed to export UserUpdate type");
        LoginSuccessResponse::export_all_to(output_dir)
            .expect("Failed to export LoginSuccessResponse type");
        Grant::export_all_to(output_dir).expect("Failed to export Grant type");
        TeamAccessInput::export_all_to(output_dir).expect("Failed to export TeamAccessInput type");
        ErrorResponse::export_all_to(output_dir).expect("Failed to export ErrorResponse type");
        HealthStatus::export_all_to(output_dir).expect("Failed to export HealthStatus type");

        DepartmentInput::export_all_to(output_dir).expect("Failed to export DepartmentInput type");
        ProductionLineInput::export_all_to(output_dir)
            .expect("Failed to export ProductionLineInput type");
        ProductionLineUpdate::export_all_to(output_dir)
            .expect("Failed to export ProductionLineUpdate type");
        TeamInput::export_all_to(output_dir).expect("Failed to export TeamInput type");
        TeamUpdate::export_all_to(output_dir).expect("Failed to export TeamUpdate type");
        StationInput::export_all_to(output_dir).expect("Failed to export StationInput type");
        EmployeeInput::export_all_to(output_dir).expect("Failed to export EmployeeInput type");
        EmployeeUpdate::export_all_to(output_dir).expect("Failed to export EmployeeUpdate type");

        MatrixContext::export_all_to(output_dir).expect("Failed to export MatrixContext type");
        TeamMatrix::export_all_to(output_dir).expect("Failed to export TeamMatrix type");
        RatingEdit::export_all_to(output_dir).expect("Failed to export RatingEdit type");
        RatingOutcome::export_all_to(output_dir).expect("Failed to export RatingOutcome type");

        TeamStatistics::export_all_to(output_dir).expect("Failed to export TeamStatistics type");
        StationRatingSummary::export_all_to(output_dir)
            .expect("Failed to export StationRatingSummary type");
        StationGapRequest::export_all_to(output_dir)
            .expect("Failed to export StationGapRequest type");
        StationGap::export_all_to(output_dir).expect("Failed to export StationGap type");

        ChangeEvent::export_all_to(output_dir).expect("Failed to export ChangeEvent type");
        ConnectionState::export_all_to(output_dir).expect("Failed to export ConnectionState type");

        ContactRequest::export_all_to(output_dir).expect("Failed to export ContactRequest type");
        QuoteRequest::export_all_to(output_dir).expect("Failed to export QuoteRequest type");
        MailSent::export_all_to(output_dir).expect("Failed to export MailSent type");
        MailFailure::export_all_to(output_dir).expect("Failed to export MailFailure type");

        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
