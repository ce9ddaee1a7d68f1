use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::JwtSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_exam, create_subject, create_task, delete_exam, delete_subject, delete_task,
    get_current_user, get_exam, get_subject, get_task, health_check, list_exams, list_subjects,
    list_tasks, login, refresh, register, update_exam, update_subject, update_task,
    update_task_status,
};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let jwt_config_data = web::Data::new(jwt_config.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_config_data.clone())
            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            // Protected routes (require a valid access token)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/subjects", web::post().to(create_subject))
                    .route("/subjects", web::get().to(list_subjects))
                    .route("/subjects/{id}", web::get().to(get_subject))
                    .route("/subjects/{id}", web::put().to(update_subject))
                    .route("/subjects/{id}", web::delete().to(delete_subject))
                    .route("/tasks", web::post().to(create_task))
                    .route("/tasks", web::get().to(list_tasks))
                    .route("/tasks/{id}", web::get().to(get_task))
                    .route("/tasks/{id}", web::put().to(update_task))
                    .route("/tasks/{id}/status", web::patch().to(update_task_status))
                    .route("/tasks/{id}", web::delete().to(delete_task))
                    .route("/exams", web::post().to(create_exam))
                    .route("/exams", web::get().to(list_exams))
                    .route("/exams/{id}", web::get().to(get_exam))
                    .route("/exams/{id}", web::put().to(update_exam))
                    .route("/exams/{id}", web::delete().to(delete_exam)),
            )
            // Static file serving (must be last to not override API routes)
            .service(fs::Files::new("/", "./public").index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
