pub mod exams;
pub mod index;

pub use exams::*;
pub use index::*;

use actix_web::web;

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(healthz)).service(
        web::scope("/api/exams")
            .route("/parse", web::post().to(parse_exam_upload))
            .route("/parse-blocks", web::post().to(parse_blocks)),
    );
}
