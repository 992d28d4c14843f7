#![cfg(feature = "weather")]

#[cfg(test)]
mod kma_integration_tests {
    use mockito::{Matcher, Server, ServerGuard};
    use sitesafe::core::config::KmaConfig;
    use sitesafe::heat_wave::HeatAlertLevel;
    use sitesafe::weather::{to_grid, KmaClient, WeatherError};

    fn client(server: &ServerGuard) -> KmaClient {
        let config = KmaConfig {
            service_key: "kma-key".to_string(),
            base_url: server.url(),
        };
        KmaClient::new(reqwest::Client::new(), &config)
    }

    #[tokio::test]
    async fn test_nowcast_parses_observations() {
        let mut server = Server::new_async().await;
        let grid = to_grid(37.5665, 126.9780);

        let mock = server
            .mock("GET", "/getUltraSrtNcst")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("serviceKey".into(), "kma-key".into()),
                Matcher::UrlEncoded("dataType".into(), "JSON".into()),
                Matcher::UrlEncoded("base_date".into(), "20250715".into()),
                Matcher::UrlEncoded("base_time".into(), "1400".into()),
                Matcher::UrlEncoded("nx".into(), "60".into()),
                Matcher::UrlEncoded("ny".into(), "127".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"response":{"header":{"resultCode":"00","resultMsg":"NORMAL_SERVICE"},
                "body":{"dataType":"JSON","items":{"item":[
                    {"baseDate":"20250715","baseTime":"1400","category":"PTY","nx":60,"ny":127,"obsrValue":"0"},
                    {"baseDate":"20250715","baseTime":"1400","category":"REH","nx":60,"ny":127,"obsrValue":"60"},
                    {"baseDate":"20250715","baseTime":"1400","category":"RN1","nx":60,"ny":127,"obsrValue":"0"},
                    {"baseDate":"20250715","baseTime":"1400","category":"T1H","nx":60,"ny":127,"obsrValue":"33.0"},
                    {"baseDate":"20250715","baseTime":"1400","category":"WSD","nx":60,"ny":127,"obsrValue":"1.8"}
                ]},"pageNo":1,"numOfRows":1000,"totalCount":5}}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let report = client(&server)
            .nowcast(grid, "20250715", "1400")
            .await
            .unwrap();

        assert_eq!((report.nx, report.ny), (60, 127));
        assert_eq!(report.temperature, Some(33.0));
        assert_eq!(report.humidity, Some(60.0));
        assert_eq!(report.wind_speed, Some(1.8));
        assert_eq!(report.rainfall, Some(0.0));
        assert_eq!(report.precipitation_type, "없음");
        let feels_like = report.feels_like.unwrap();
        assert!((33.3..=33.6).contains(&feels_like), "got {feels_like}");
        assert_eq!(report.alert_level, HeatAlertLevel::Advisory);

        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["rainfall"], 0.0);
        assert_eq!(body["precipitation_type"], "없음");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_nowcast_result_code_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/getUltraSrtNcst")
            .match_query(Matcher::Any)
            .with_body(r#"{"response":{"header":{"resultCode":"03","resultMsg":"NO_DATA"}}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .nowcast(to_grid(35.1796, 129.0756), "20250715", "0300")
            .await
            .unwrap_err();
        match err {
            WeatherError::Api { code, message } => {
                assert_eq!(code, "03");
                assert_eq!(message, "NO_DATA");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nowcast_xml_key_error_is_invalid_response() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/getUltraSrtNcst")
            .match_query(Matcher::Any)
            .with_header("content-type", "text/xml")
            .with_body(
                "<OpenAPI_ServiceResponse><cmmMsgHeader><returnAuthMsg>SERVICE_KEY_IS_NOT_REGISTERED_ERROR</returnAuthMsg></cmmMsgHeader></OpenAPI_ServiceResponse>",
            )
            .create_async()
            .await;

        let err = client(&server)
            .nowcast(to_grid(33.4996, 126.5312), "20250715", "1400")
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidResponse(_)));
    }
}
