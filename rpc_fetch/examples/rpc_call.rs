//! Calls a JSON-RPC endpoint and prints the normalized outcome
//!
//! ```sh
//! cargo run --example rpc_call -- http://localhost:8080/rpc get_items '{"page": 1}'
//! ```
//!
//! Without a URL a throwaway local server answering with one page of items is started.
//! Set `RPC_FETCH_LOG=debug` to log request bodies and dispatch to the trace file.

use std::time::Duration;

use rpc_fetch::support::tracing::{init_file_tracing, trace_log_path};
use rpc_fetch::{ClientConfig, ExtractOptions, FetchOptions, RpcClient, RpcRequest, RpcResponse};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const DEMO_REPLY: &str = r#"{"jsonrpc":"2.0","id":"demo","result":{"data":[{"name":"alpha"},{"name":"beta"}],"total":2,"page_size":10,"current_page":1,"total_pages":1}}"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_file_tracing().map_err(|e| format!("{e:?}"))?;
    eprintln!("tracing to {}", trace_log_path().display());

    let mut args = std::env::args().skip(1);
    let url = match args.next() {
        Some(url) => url,
        None => serve_demo().await?,
    };
    let method = args.next().unwrap_or_else(|| "get_items".to_string());
    let params: Value = match args.next() {
        Some(raw) => serde_json::from_str(&raw)?,
        None => Value::Object(serde_json::Map::new()),
    };

    let client = RpcClient::new(ClientConfig::from_env().map_err(|e| format!("{e:?}"))?)
        .map_err(|e| format!("{e:?}"))?;

    let request = RpcRequest::new(method)
        .with_id("demo")
        .params_from_value(params)
        .map_err(|e| format!("{e:?}"))?;

    client.subscribe("demo", |response| {
        println!("notified: {}", kind_of(response));
    });

    let response = client
        .fetch(&url, FetchOptions::json(request), &ExtractOptions::new())
        .await;

    match &response {
        RpcResponse::Paged(paged) => {
            println!(
                "page {}/{} ({} of {} items)",
                paged.result.current_page,
                paged.result.total_pages,
                paged.result.len(),
                paged.result.total
            );
            for item in &paged.result.data {
                println!("  {item}");
            }
        }
        RpcResponse::Data(data) => println!("result: {}", data.result),
        RpcResponse::Error(error) => println!("error: {error}"),
    }

    // let the dispatcher deliver the notification
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}

const fn kind_of(response: &RpcResponse) -> &'static str {
    match response {
        RpcResponse::Paged(_) => "paged data",
        RpcResponse::Data(_) => "data",
        RpcResponse::Error(_) => "error",
    }
}

/// Answer a single request with `DEMO_REPLY` and return the URL to call
async fn serve_demo() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/rpc", listener.local_addr()?);

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut buf = vec![0_u8; 16 * 1024];
        let _ = socket.read(&mut buf).await;
        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{DEMO_REPLY}",
            DEMO_REPLY.len()
        );
        let _ = socket.write_all(reply.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    Ok(url)
}
