use std::io::Cursor;
use std::sync::Arc;

use jrpc::{Handler, RpcError, Server, Transport};
use serde_json::{json, Value};

fn responses(output: Vec<u8>) -> Vec<Value> {
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn serves_requests_in_input_order() {
    let server = Server::new();
    let add: Handler = Arc::new(|params: Value| -> Result<Value, RpcError> {
        let a = params["a"].as_i64().ok_or_else(|| RpcError::invalid_params("a"))?;
        let b = params["b"].as_i64().ok_or_else(|| RpcError::invalid_params("b"))?;
        Ok(json!(a + b))
    });
    server.register("add", add).unwrap();

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"add","params":{"a":1,"b":2}}"#,
        "\n\n",
        r#"{"jsonrpc":"2.0","method":"add","params":{"a":1,"b":2}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"add","params":{"a":1}}"#,
        "\n",
    );
    let mut reader = Cursor::new(input.as_bytes());
    let mut output = Vec::new();
    server.run(&mut reader, &mut output).unwrap();

    let res = responses(output);
    assert_eq!(res.len(), 2);
    assert_eq!(res[0]["id"], json!(1));
    assert_eq!(res[0]["result"], json!(3));
    assert_eq!(res[1]["id"], json!(2));
    assert_eq!(res[1]["error"]["code"], json!(RpcError::INVALID_PARAMS));
}

#[test]
fn empty_input_terminates_immediately() {
    let server = Server::new();
    let mut reader = Cursor::new(Vec::new());
    let mut output = Vec::new();
    server.run(&mut reader, &mut output).unwrap();
    assert!(output.is_empty());
}

#[test]
fn last_line_without_newline_is_served() {
    let server = Server::new();
    let pong: Handler = Arc::new(|_: Value| -> Result<Value, RpcError> { Ok(json!("pong")) });
    server.register("ping", pong).unwrap();

    let mut reader = Cursor::new(br#"{"id":"p","method":"ping"}"#.to_vec());
    let mut output = Vec::new();
    server.run(&mut reader, &mut output).unwrap();

    let res = responses(output);
    assert_eq!(res, vec![json!({"jsonrpc": "2.0", "id": "p", "result": "pong"})]);
}
