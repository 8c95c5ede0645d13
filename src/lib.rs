pub mod ai;
pub mod app_config;
pub mod auth;
pub mod cache;
pub mod db;
pub mod ingest;
pub mod ip;
pub mod middleware;
pub mod orm;
pub mod permission;
pub mod rate_limit;
pub mod web;
