mod responses;

use async_std::net::TcpStream;

use crate::http::request::Request;
use crate::http::response::ResponseWriter;
use crate::http::status::StatusCode;
use crate::net::server::Handler;

/// Demo site served by the `httpframe` binary.
pub struct SiteHandler;

impl Handler for SiteHandler {
    async fn handle(&self, writer: &mut ResponseWriter<&TcpStream>, req: &Request) {
        match req.request_line.target.as_str() {
            "/yourproblem" => responses::html_page(writer, StatusCode::BAD_REQUEST).await,
            "/myproblem" => responses::html_page(writer, StatusCode::INTERNAL_SERVER_ERROR).await,
            "/stream" => responses::chunked_stream(writer).await,
            _ => responses::html_page(writer, StatusCode::OK).await,
        }
    }
}
