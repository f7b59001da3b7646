//! Access decision benchmark
//!
//! Target: <1μs per decision

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use itdesk_common::CompanyId;
use itdesk_support::{AccessConfig, AccessPolicy, Action, EmployeeLink, TicketFacts, TicketStatus};
use itdesk_tenant::{Role, User};

fn access_decision_benchmark(c: &mut Criterion) {
    let company = CompanyId::new();
    let tech = User::new(Some(company), "Tom", "tom@acme.test", &[Role::Technician]);
    let opener = User::new(Some(company), "Vi", "vi@acme.test", &[Role::Viewer]);
    let facts = TicketFacts {
        company_id: company,
        opened_by: opener.id,
        assigned_to: None,
        status: TicketStatus::InProgress,
        employee: Some(EmployeeLink { user_id: None, email: "TOM@acme.test".into() }),
    };
    let policy = AccessPolicy::new(AccessConfig { allow_employee_email_link: true });

    let mut group = c.benchmark_group("access_decision");
    for action in Action::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(action), &action, |b, &action| {
            b.iter(|| black_box(policy.evaluate(black_box(&tech), action, black_box(&facts))))
        });
    }
    group.finish();
}

fn multi_role_benchmark(c: &mut Criterion) {
    let company = CompanyId::new();
    let facts = TicketFacts {
        company_id: company,
        opened_by: User::new(Some(company), "A", "a@x.test", &[Role::Viewer]).id,
        assigned_to: None,
        status: TicketStatus::Open,
        employee: None,
    };
    let policy = AccessPolicy::default();

    let mut group = c.benchmark_group("role_count");
    for roles in [1usize, 2, 4] {
        let user = User::new(Some(company), "M", "m@x.test", &Role::ALL[..roles]);
        group.bench_with_input(BenchmarkId::from_parameter(roles), &user, |b, user| {
            b.iter(|| black_box(policy.evaluate(user, Action::View, black_box(&facts))))
        });
    }
    group.finish();
}

criterion_group!(benches, access_decision_benchmark, multi_role_benchmark);
criterion_main!(benches);
