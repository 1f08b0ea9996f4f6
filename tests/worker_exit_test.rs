//! Worker 进程集成测试：stdin 保持打开时收到控制消息后进程能退出；启动失败时 stdout 上有 error 事件

#[cfg(test)]
mod tests {
    use std::process::Stdio;
    use std::time::Duration;

    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::process::Command;

    /// 最小桌面服务：POST /sandboxes 返回沙箱信息，其余请求一律 200
    async fn serve_fake_desktop(listener: TcpListener) {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }
                let body = if head.starts_with(b"POST /sandboxes ") {
                    r#"{"sandboxId":"sbx-1","streamUrl":"http://stream/sbx-1"}"#
                } else {
                    "{}"
                };
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    }

    fn worker() -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_deskhand-worker"));
        cmd.env("RUST_LOG", "off")
            .env("DESKHAND__REPLAY__ENABLED", "false")
            .env("DESKHAND__WORKER__POLL_INTERVAL_SECS", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn events(stdout: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(stdout)
            .lines()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }

    #[tokio::test]
    async fn test_exits_after_control_message_with_stdin_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_fake_desktop(listener));

        let mut child = worker()
            .env("DESKHAND__DESKTOP__BASE_URL", format!("http://{addr}"))
            .spawn()
            .unwrap();
        let mut stdin = child.stdin.take().unwrap();
        stdin
            .write_all(b"{\"type\":\"no_more_tasks\"}\n")
            .await
            .unwrap();
        stdin.flush().await.unwrap();

        // stdin 句柄仍然存活，进程必须自行退出
        let output = tokio::time::timeout(Duration::from_secs(15), child.wait_with_output())
            .await
            .expect("worker did not exit while stdin stayed open")
            .unwrap();
        assert!(output.status.success());

        let events = events(&output.stdout);
        assert_eq!(events[0]["type"], "sandbox_ready");
        assert_eq!(events[0]["sandboxId"], "sbx-1");
        assert_eq!(events.last().unwrap()["type"], "terminated");
        drop(stdin);
    }

    #[tokio::test]
    async fn test_config_error_is_reported_on_stdout() {
        let child = worker()
            .env("DESKHAND__WORKER__MAX_STEPS", "many")
            .spawn()
            .unwrap();

        let output = tokio::time::timeout(Duration::from_secs(15), child.wait_with_output())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let events = events(&output.stdout);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "error");
        assert!(events[0]["error"].as_str().unwrap().starts_with("Config error"));
    }
}
