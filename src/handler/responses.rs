use async_std::net::TcpStream;
use log::error;

use crate::config::config;
use crate::http::headers::Headers;
use crate::http::response::{ResponseWriter, default_headers};
use crate::http::status::StatusCode;

/// Writes a small HTML page for the given status code.
pub async fn html_page(writer: &mut ResponseWriter<&TcpStream>, status: StatusCode) {
    let detail = match status {
        StatusCode::BAD_REQUEST => "Your request could not be understood.",
        StatusCode::INTERNAL_SERVER_ERROR => "Something went wrong on our end.",
        _ => "Your request was handled.",
    };
    let reason = status.reason_phrase();
    let body = format!(
        "<html>\
           <head><title>{status} {reason}</title></head>\
           <body>\
             <h1>{reason}</h1>\
             <p>{detail}</p>\
             <p><i>{}</i></p>\
           </body>\
         </html>",
        config().server_name,
    )
    .into_bytes();

    let outcome = async {
        writer.write_status_line(status).await?;
        let mut headers = default_headers(body.len());
        headers.replace("Content-Type", "text/html");
        writer.write_headers(&headers).await?;
        writer.write_body(&body).await
    }
    .await;

    if let Err(err) = outcome {
        error!("failed to write {status} page: {err}");
    }
}

/// Streams a chunked body with a declared trailer carrying the total length.
pub async fn chunked_stream(writer: &mut ResponseWriter<&TcpStream>) {
    let outcome = async {
        writer.write_status_line(StatusCode::OK).await?;

        let mut headers = default_headers(0);
        headers.remove("content-length");
        headers.set("Transfer-Encoding", "chunked");
        headers.set("Trailer", "X-Content-Length");
        writer.write_headers(&headers).await?;

        let mut total = 0;
        for n in 0..20 {
            let chunk = format!("chunk {n} from {}\n", config().server_name);
            total += writer.write_chunked_body(chunk.as_bytes()).await?;
        }
        writer.write_chunked_body(b"").await?;

        let mut trailers = Headers::new();
        trailers.set("X-Content-Length", &total.to_string());
        writer.write_trailers(&trailers).await
    }
    .await;

    if let Err(err) = outcome {
        error!("failed to stream chunked response: {err}");
    }
}
