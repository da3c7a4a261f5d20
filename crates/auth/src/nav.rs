use crate::Role;

/// A navigation entry the shell renders for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavLink {
    pub path: &'static str,
    pub label: &'static str,
}

const DASHBOARD: NavLink = NavLink {
    path: "/dashboard",
    label: "Dashboard",
};

const ADMIN_LINKS: &[NavLink] = &[
    DASHBOARD,
    NavLink { path: "/users", label: "All Users" },
    NavLink { path: "/user/admins", label: "Admins" },
    NavLink { path: "/user/managers", label: "Managers" },
    NavLink { path: "/user/employees", label: "Employees" },
];

const BASE_LINKS: &[NavLink] = &[DASHBOARD];

/// Navigation links for a role.
///
/// The match is exhaustive over [`Role`]; adding a role without deciding its
/// navigation is a compile error, which is the point of the enum.
pub fn nav_links(role: Role) -> &'static [NavLink] {
    match role {
        Role::Admin => ADMIN_LINKS,
        Role::Manager => BASE_LINKS,
        Role::Employee => BASE_LINKS,
        Role::User => BASE_LINKS,
    }
}
