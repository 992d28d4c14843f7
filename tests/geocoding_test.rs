#[cfg(test)]
mod geocoding_integration_tests {
    use mockito::{Matcher, Server, ServerGuard};
    use sitesafe::core::config::VWorldConfig;
    use sitesafe::geocoding::{AddressType, GeocodeError, VWorldClient};

    fn client(server: &ServerGuard) -> VWorldClient {
        let config = VWorldConfig {
            api_key: "test-key".to_string(),
            base_url: server.url(),
        };
        VWorldClient::new(reqwest::Client::new(), &config)
    }

    fn query(address: &str, address_type: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("address".into(), address.into()),
            Matcher::UrlEncoded("type".into(), address_type.into()),
            Matcher::UrlEncoded("key".into(), "test-key".into()),
        ])
    }

    const NOT_FOUND: &str = r#"{"response":{"status":"NOT_FOUND"}}"#;

    #[tokio::test]
    async fn test_falls_back_to_shorter_address() {
        let mut server = Server::new_async().await;
        let full = "대전광역시 서구 둔산로 100 본관";
        let shorter = "대전광역시 서구 둔산로 100";

        let full_road = server
            .mock("GET", "/")
            .match_query(query(full, "road"))
            .with_body(NOT_FOUND)
            .expect(1)
            .create_async()
            .await;
        let full_parcel = server
            .mock("GET", "/")
            .match_query(query(full, "parcel"))
            .with_body(NOT_FOUND)
            .expect(1)
            .create_async()
            .await;
        let hit = server
            .mock("GET", "/")
            .match_query(query(shorter, "road"))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"response":{"status":"OK",
                    "refined":{"text":"대전광역시 서구 둔산로 100 (둔산동)"},
                    "result":{"point":{"x":"127.3845","y":"36.3504"}}}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let result = client(&server).geocode(full).await.unwrap();

        assert_eq!(result.attempts, 2);
        assert_eq!(result.query, shorter);
        assert_eq!(result.address_type, AddressType::Road);
        assert_eq!(result.matched_address, "대전광역시 서구 둔산로 100 (둔산동)");
        assert!((result.latitude - 36.3504).abs() < 1e-9);
        assert!((result.longitude - 127.3845).abs() < 1e-9);

        full_road.assert_async().await;
        full_parcel.assert_async().await;
        hit.assert_async().await;
    }

    #[tokio::test]
    async fn test_parcel_address_used_when_road_misses() {
        let mut server = Server::new_async().await;
        let address = "세종특별자치시 어진동";

        server
            .mock("GET", "/")
            .match_query(query(address, "road"))
            .with_body(NOT_FOUND)
            .create_async()
            .await;
        server
            .mock("GET", "/")
            .match_query(query(address, "parcel"))
            .with_body(r#"{"response":{"status":"OK","result":{"point":{"x":"127.25","y":"36.5"}}}}"#)
            .create_async()
            .await;

        let result = client(&server).geocode(address).await.unwrap();
        assert_eq!(result.address_type, AddressType::Parcel);
        assert_eq!(result.matched_address, address);
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_no_match_reports_attempts() {
        let mut server = Server::new_async().await;
        let address = "세종특별자치시 한누리대로";

        for address_type in ["road", "parcel"] {
            server
                .mock("GET", "/")
                .match_query(query(address, address_type))
                .with_body(NOT_FOUND)
                .create_async()
                .await;
        }

        let err = client(&server).geocode(address).await.unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound { attempts: 1 }));
    }

    #[tokio::test]
    async fn test_api_error_stops_ladder() {
        let mut server = Server::new_async().await;
        let address = "서울특별시 중구 세종대로 110";

        let mock = server
            .mock("GET", "/")
            .match_query(query(address, "road"))
            .with_body(r#"{"response":{"status":"ERROR","error":{"text":"인증키 정보가 올바르지 않습니다."}}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server).geocode(address).await.unwrap_err();
        match err {
            GeocodeError::Api(msg) => assert!(msg.contains("인증키")),
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unconfigured_client_makes_no_requests() {
        let client = VWorldClient::new(reqwest::Client::new(), &VWorldConfig::default());
        assert!(matches!(
            client.geocode("서울특별시 중구 세종대로 110").await,
            Err(GeocodeError::NotConfigured)
        ));
    }
}
