use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reusenet::http::Headers;

fn browser_headers() -> Headers {
    let mut headers = Headers::new();
    headers.add("Host", "en.wikipedia.org").unwrap();
    headers.add(
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"
    ).unwrap();
    headers.add("Accept-Encoding", "gzip, deflate, br").unwrap();
    headers.add("Accept-Language", "en-GB,en;q=0.9").unwrap();
    headers.add("Cache-Control", "max-age=0").unwrap();
    headers.add("Connection", "keep-alive").unwrap();
    headers.add(
        "User-Agent",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36"
    ).unwrap();
    headers
}

fn benchmark_headers_encode(c: &mut Criterion) {
    let headers = browser_headers();
    c.bench_function("headers_encode", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(512);
            black_box(&headers).encode(&mut buf);
            black_box(buf)
        })
    });

    c.bench_function("headers_to_header_map", |b| {
        b.iter(|| black_box(&headers).to_header_map())
    });
}

fn benchmark_headers_parse(c: &mut Criterion) {
    let lines = [
        "Date: Mon, 02 Oct 2023 10:00:00 GMT",
        "Content-Type: text/html; charset=UTF-8",
        "Content-Length: 84213",
        "Connection: keep-alive",
        "Cache-Control: private, s-maxage=0, max-age=0, must-revalidate",
        "Set-Cookie: WMF-Last-Access=02-Oct-2023;Path=/;HttpOnly;secure",
        "Set-Cookie: GeoIP=GB:::51.50:-0.12:v4; Path=/; secure; Domain=.wikipedia.org",
    ];
    c.bench_function("headers_add_line", |b| {
        b.iter(|| {
            let mut headers = Headers::new();
            for line in lines {
                headers.add_line(black_box(line));
            }
            black_box(headers.get("content-length"))
                .map(|v| v.len())
        })
    });
}

criterion_group!(benches, benchmark_headers_encode, benchmark_headers_parse);
criterion_main!(benches);
